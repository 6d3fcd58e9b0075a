//! Сырые объявления библиотеки AS5216.
//!
//! Структуры повторяют заголовок производителя один в один
//! (`#pragma pack(1)`), функции объявлены с соглашением `stdcall`
//! (`extern "system"`). Поля `bool` из C++ представлены как `u8`:
//! библиотека может вернуть любое ненулевое значение.
//!
//! Библиотека линкуется только с фичей `as5216-sdk`.

#![allow(non_snake_case, non_camel_case_types)]

use std::{
    mem::size_of,
    os::raw::{c_char, c_int, c_long, c_short, c_uchar, c_uint, c_ulong, c_ushort},
    ptr, slice,
};

use avaspec_types::{
    AVS_SERIAL_LEN, CONTROL_SETTINGS_SIZE, DARK_CORRECTION_SIZE, DETECTOR_SIZE,
    DEVICE_CONFIG_SIZE, IDENTITY_SIZE, IRRADIANCE_SIZE, MAX_NR_PIXELS, MAX_TEMP_SENSORS,
    MAX_VIDEO_CHANNELS, MEAS_CONFIG_SIZE, NR_ANALOG_LIMITS, NR_DAC_POL_COEF, NR_DEFECTIVE_PIXELS,
    NR_DIGITAL_LIMITS, NR_NONLIN_POL_COEF, NR_TEMP_POL_COEF, NR_WAVELEN_POL_COEF,
    PROCESS_CONTROL_SIZE, ROOT_NAME_LEN, SD_CARD_SIZE, SETTINGS_RESERVED_LEN, SMOOTHING_SIZE,
    SPECTRUM_CALIBRATION_SIZE, SPECTRUM_CORRECTION_SIZE, STAND_ALONE_SIZE, TEC_CONTROL_SIZE,
    TEMP_SENSOR_SIZE, TIME_STAMP_SIZE, TRIGGER_SIZE, USER_ID_LEN,
};

pub type AvsHandle = c_long;
pub type SensorType = u8;

pub const INVALID_AVS_HANDLE_VALUE: AvsHandle = 1000;

/// `DEVICE_STATUS`
pub const UNKNOWN: c_uchar = 0;
pub const AVAILABLE: c_uchar = 1;
pub const IN_USE_BY_APPLICATION: c_uchar = 2;
pub const IN_USE_BY_OTHER: c_uchar = 3;

////////////////////////////////////////////////////////////////////////////////
// Структуры
////////////////////////////////////////////////////////////////////////////////

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct ControlSettingsType {
    pub m_StrobeControl: u16,
    pub m_LaserDelay: u32,
    pub m_LaserWidth: u32,
    pub m_LaserWaveLength: f32,
    pub m_StoreToRam: u16,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DarkCorrectionType {
    pub m_Enable: u8,
    pub m_ForgetPercentage: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DetectorType {
    pub m_SensorType: SensorType,
    pub m_NrPixels: u16,
    pub m_aFit: [f32; NR_WAVELEN_POL_COEF],
    pub m_NLEnable: u8,
    pub m_aNLCorrect: [f64; NR_NONLIN_POL_COEF],
    pub m_aLowNLCounts: f64,
    pub m_aHighNLCounts: f64,
    pub m_Gain: [f32; MAX_VIDEO_CHANNELS],
    pub m_Reserved: f32,
    pub m_Offset: [f32; MAX_VIDEO_CHANNELS],
    pub m_ExtOffset: f32,
    pub m_DefectivePixels: [u16; NR_DEFECTIVE_PIXELS],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct SmoothingType {
    pub m_SmoothPix: u16,
    pub m_SmoothModel: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct SpectrumCalibrationType {
    pub m_Smoothing: SmoothingType,
    pub m_CalInttime: f32,
    pub m_aCalibConvers: [f32; MAX_NR_PIXELS],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct IrradianceType {
    pub m_IntensityCalib: SpectrumCalibrationType,
    pub m_CalibrationType: u8,
    pub m_FiberDiameter: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TriggerType {
    pub m_Mode: u8,
    pub m_Source: u8,
    pub m_SourceType: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct MeasConfigType {
    pub m_StartPixel: u16,
    pub m_StopPixel: u16,
    pub m_IntegrationTime: f32,
    pub m_IntegrationDelay: u32,
    pub m_NrAverages: u32,
    pub m_CorDynDark: DarkCorrectionType,
    pub m_Smoothing: SmoothingType,
    pub m_SaturationDetection: u8,
    pub m_Trigger: TriggerType,
    pub m_Control: ControlSettingsType,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TimeStampType {
    pub m_Date: u16,
    pub m_Time: u16,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct SDCardType {
    pub m_Enable: u8,
    pub m_SpectrumType: u8,
    pub m_aFileRootName: [c_char; ROOT_NAME_LEN],
    pub m_TimeStamp: TimeStampType,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct SpectrumCorrectionType {
    pub m_aSpectrumCorrect: [f32; MAX_NR_PIXELS],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct StandAloneType {
    pub m_Enable: u8,
    pub m_Meas: MeasConfigType,
    pub m_Nmsr: i16,
    pub m_SDCard: SDCardType,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TempSensorType {
    pub m_aFit: [f32; NR_TEMP_POL_COEF],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TecControlType {
    pub m_Enable: u8,
    pub m_Setpoint: f32,
    pub m_aFit: [f32; NR_DAC_POL_COEF],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct ProcessControlType {
    pub AnalogLow: [f32; NR_ANALOG_LIMITS],
    pub AnalogHigh: [f32; NR_ANALOG_LIMITS],
    pub DigitalLow: [f32; NR_DIGITAL_LIMITS],
    pub DigitalHigh: [f32; NR_DIGITAL_LIMITS],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct DeviceConfigType {
    pub m_Len: u16,
    pub m_ConfigVersion: u16,
    pub m_aUserFriendlyId: [c_char; USER_ID_LEN],
    pub m_Detector: DetectorType,
    pub m_Irradiance: IrradianceType,
    pub m_Reflectance: SpectrumCalibrationType,
    pub m_SpectrumCorrect: SpectrumCorrectionType,
    pub m_StandAlone: StandAloneType,
    pub m_aTemperature: [TempSensorType; MAX_TEMP_SENSORS],
    pub m_TecControl: TecControlType,
    pub m_ProcessControl: ProcessControlType,
    pub m_aReserved: [u8; SETTINGS_RESERVED_LEN],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct AvsIdentityType {
    pub SerialNumber: [c_char; AVS_SERIAL_LEN],
    pub UserFriendlyName: [c_char; USER_ID_LEN],
    pub Status: c_uchar,
}

////////////////////////////////////////////////////////////////////////////////
// Побайтный доступ
////////////////////////////////////////////////////////////////////////////////

/// Упакованная структура из одних целых и вещественных полей.
///
/// # Safety
///
/// Реализация допустима только для `#[repr(C, packed)]` типов, у которых
/// любое битовое представление корректно.
pub unsafe trait Packed: Copy + Sized {
    /// Структура, заполненная нулями.
    fn zeroed() -> Self {
        // SAFETY: все поля допускают нулевое представление
        unsafe { std::mem::zeroed() }
    }

    /// Копия из буфера длиной ровно `size_of::<Self>()`.
    fn from_packed_bytes(buf: &[u8]) -> Option<Self> {
        if buf.len() != size_of::<Self>() {
            return None;
        }

        let mut value = Self::zeroed();
        // SAFETY: длины совпадают, выравнивание у packed типа равно 1
        unsafe {
            ptr::copy_nonoverlapping(
                buf.as_ptr(),
                &mut value as *mut Self as *mut u8,
                buf.len(),
            );
        }
        Some(value)
    }

    /// Представление структуры в памяти.
    fn as_packed_bytes(&self) -> &[u8] {
        // SAFETY: у packed типа нет заполнителей, все байты инициализированы
        unsafe { slice::from_raw_parts(self as *const Self as *const u8, size_of::<Self>()) }
    }
}

unsafe impl Packed for ControlSettingsType {}
unsafe impl Packed for DarkCorrectionType {}
unsafe impl Packed for DetectorType {}
unsafe impl Packed for SmoothingType {}
unsafe impl Packed for SpectrumCalibrationType {}
unsafe impl Packed for IrradianceType {}
unsafe impl Packed for TriggerType {}
unsafe impl Packed for MeasConfigType {}
unsafe impl Packed for TimeStampType {}
unsafe impl Packed for SDCardType {}
unsafe impl Packed for SpectrumCorrectionType {}
unsafe impl Packed for StandAloneType {}
unsafe impl Packed for TempSensorType {}
unsafe impl Packed for TecControlType {}
unsafe impl Packed for ProcessControlType {}
unsafe impl Packed for DeviceConfigType {}
unsafe impl Packed for AvsIdentityType {}

// Размеры проверяются при компиляции
const _: () = assert!(size_of::<ControlSettingsType>() == CONTROL_SETTINGS_SIZE);
const _: () = assert!(size_of::<DarkCorrectionType>() == DARK_CORRECTION_SIZE);
const _: () = assert!(size_of::<DetectorType>() == DETECTOR_SIZE);
const _: () = assert!(size_of::<SmoothingType>() == SMOOTHING_SIZE);
const _: () = assert!(size_of::<SpectrumCalibrationType>() == SPECTRUM_CALIBRATION_SIZE);
const _: () = assert!(size_of::<IrradianceType>() == IRRADIANCE_SIZE);
const _: () = assert!(size_of::<TriggerType>() == TRIGGER_SIZE);
const _: () = assert!(size_of::<MeasConfigType>() == MEAS_CONFIG_SIZE);
const _: () = assert!(size_of::<TimeStampType>() == TIME_STAMP_SIZE);
const _: () = assert!(size_of::<SDCardType>() == SD_CARD_SIZE);
const _: () = assert!(size_of::<SpectrumCorrectionType>() == SPECTRUM_CORRECTION_SIZE);
const _: () = assert!(size_of::<StandAloneType>() == STAND_ALONE_SIZE);
const _: () = assert!(size_of::<TempSensorType>() == TEMP_SENSOR_SIZE);
const _: () = assert!(size_of::<TecControlType>() == TEC_CONTROL_SIZE);
const _: () = assert!(size_of::<ProcessControlType>() == PROCESS_CONTROL_SIZE);
const _: () = assert!(size_of::<DeviceConfigType>() == DEVICE_CONFIG_SIZE);
const _: () = assert!(size_of::<AvsIdentityType>() == IDENTITY_SIZE);

////////////////////////////////////////////////////////////////////////////////
// Функции
////////////////////////////////////////////////////////////////////////////////

extern "system" {
    pub fn AVS_Init(a_Port: c_short) -> c_int;
    pub fn AVS_Done() -> c_int;
    pub fn AVS_GetNrOfDevices() -> c_int;
    pub fn AVS_GetList(
        a_ListSize: c_uint,
        a_pRequiredSize: *mut c_uint,
        a_pList: *mut AvsIdentityType,
    ) -> c_int;
    pub fn AVS_Activate(a_pDeviceId: *mut AvsIdentityType) -> AvsHandle;
    /// Возвращает C++ `bool`
    pub fn AVS_Deactivate(a_hHandle: AvsHandle) -> u8;
    pub fn AVS_GetHandleFromSerial(a_pSerial: *mut c_char) -> AvsHandle;
    /// Только Windows: окно для сообщений о подключении и отключении
    pub fn AVS_Register(a_hWnd: c_long) -> u8;

    pub fn AVS_PrepareMeasure(a_hDevice: AvsHandle, a_pMeasConfig: *mut MeasConfigType) -> c_int;
    pub fn AVS_Measure(a_hDevice: AvsHandle, a_hWnd: c_long, a_Nmsr: c_short) -> c_int;
    pub fn AVS_GetLambda(a_hDevice: AvsHandle, a_pWaveLength: *mut f64) -> c_int;
    pub fn AVS_GetNumPixels(a_hDevice: AvsHandle, a_pNumPixels: *mut c_ushort) -> c_int;
    pub fn AVS_GetParameter(
        a_hDevice: AvsHandle,
        a_Size: c_uint,
        a_pRequiredSize: *mut c_uint,
        a_pDeviceParm: *mut DeviceConfigType,
    ) -> c_int;
    pub fn AVS_PollScan(a_hDevice: AvsHandle) -> c_int;
    pub fn AVS_GetScopeData(
        a_hDevice: AvsHandle,
        a_pTimeLabel: *mut c_uint,
        a_pSpectrum: *mut f64,
    ) -> c_int;
    pub fn AVS_GetSaturatedPixels(a_hDevice: AvsHandle, a_pSaturated: *mut c_uchar) -> c_int;
    pub fn AVS_GetAnalogIn(
        a_hDevice: AvsHandle,
        a_AnalogInId: c_uchar,
        a_pAnalogIn: *mut f32,
    ) -> c_int;
    pub fn AVS_GetDigIn(a_hHandle: AvsHandle, a_DigInId: c_uchar, a_pDigIn: *mut c_uchar)
        -> c_int;
    pub fn AVS_GetVersionInfo(
        a_hDevice: AvsHandle,
        a_pFPGAVersion: *mut c_char,
        a_pFirmwareVersion: *mut c_char,
        a_pDLLVersion: *mut c_char,
    ) -> c_int;
    pub fn AVS_SaveSpectraToSDCard(
        a_hDevice: AvsHandle,
        a_Enable: u8,
        a_SpectrumType: c_uchar,
        a_aFileRootName: *mut c_char,
        a_TimeStamp: TimeStampType,
    ) -> c_int;
    pub fn AVS_SetParameter(a_hDevice: AvsHandle, a_pDeviceParm: *mut DeviceConfigType) -> c_int;
    pub fn AVS_SetAnalogOut(a_hDevice: AvsHandle, a_PortId: c_uchar, a_Value: f32) -> c_int;
    pub fn AVS_SetDigOut(a_hHandle: AvsHandle, a_PortId: c_uchar, a_Status: c_uchar) -> c_int;
    pub fn AVS_SetPwmOut(
        a_hHandle: AvsHandle,
        a_PortId: c_uchar,
        a_Freq: c_ulong,
        a_Duty: c_uchar,
    ) -> c_int;
    pub fn AVS_SetSyncMode(a_hDevice: AvsHandle, a_Enable: c_uchar) -> c_int;
    pub fn AVS_StopMeasure(a_hDevice: AvsHandle) -> c_int;

    pub fn AVS_GetFileSize(
        a_hDevice: AvsHandle,
        a_pName: *mut c_char,
        a_pSize: *mut c_uint,
    ) -> c_int;
    pub fn AVS_GetFile(
        a_hDevice: AvsHandle,
        a_pName: *mut c_char,
        a_pDest: *mut c_uchar,
        a_Size: c_uint,
    ) -> c_int;
    /// `a_pName`: буфер не меньше 14 байт
    pub fn AVS_GetFirstFile(a_hDevice: AvsHandle, a_pName: *mut c_char) -> c_int;
    pub fn AVS_GetNextFile(
        a_hDevice: AvsHandle,
        a_pPrevName: *mut c_char,
        a_pNextName: *mut c_char,
    ) -> c_int;
    pub fn AVS_DeleteFile(a_hDevice: AvsHandle, a_pName: *mut c_char) -> c_int;
    pub fn AVS_SetPrescanMode(a_hDevice: AvsHandle, a_Prescan: u8) -> c_int;
    pub fn AVS_UseHighResAdc(a_hDevice: AvsHandle, a_Enable: u8) -> c_int;

    pub fn AVS_GetFirstDirectory(a_hDevice: AvsHandle, a_pName: *mut c_char) -> c_int;
    pub fn AVS_GetNextDirectory(
        a_hDevice: AvsHandle,
        a_pPrevName: *mut c_char,
        a_pNextName: *mut c_char,
    ) -> c_int;
    pub fn AVS_DeleteDirectory(a_hDevice: AvsHandle, a_pName: *mut c_char) -> c_int;
    /// `a_aName`: char[ROOT_NAME_LEN]
    pub fn AVS_SetDirectory(a_hDevice: AvsHandle, a_aName: *mut c_char) -> c_int;
    pub fn AVS_SetSensitivityMode(a_hDevice: AvsHandle, a_SensitivityMode: u32) -> c_int;
}
