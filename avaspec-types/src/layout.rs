//! Размеры упакованных структур (`#pragma pack(1)`), байт.
//!
//! Считаются из полей, как в заголовке производителя, поэтому резерв
//! `DeviceConfigType` получается ровно таким, чтобы вся запись занимала
//! 62 КиБ без 4 байт.

use crate::consts::{
    AVS_SERIAL_LEN, MAX_NR_PIXELS, MAX_TEMP_SENSORS, MAX_VIDEO_CHANNELS, NR_ANALOG_LIMITS,
    NR_DAC_POL_COEF, NR_DEFECTIVE_PIXELS, NR_DIGITAL_LIMITS, NR_NONLIN_POL_COEF,
    NR_TEMP_POL_COEF, NR_WAVELEN_POL_COEF, ROOT_NAME_LEN, USER_ID_LEN,
};

const U8: usize = 1;
const U16: usize = 2;
const U32: usize = 4;
const F32: usize = 4;
const F64: usize = 8;

pub const CONTROL_SETTINGS_SIZE: usize = U16 + U32 + U32 + F32 + U16;
pub const DARK_CORRECTION_SIZE: usize = U8 + U8;
pub const DETECTOR_SIZE: usize = U8
    + U16
    + F32 * NR_WAVELEN_POL_COEF
    + U8
    + F64 * NR_NONLIN_POL_COEF
    + F64
    + F64
    + F32 * MAX_VIDEO_CHANNELS
    + F32
    + F32 * MAX_VIDEO_CHANNELS
    + F32
    + U16 * NR_DEFECTIVE_PIXELS;
pub const SMOOTHING_SIZE: usize = U16 + U8;
pub const SPECTRUM_CALIBRATION_SIZE: usize = SMOOTHING_SIZE + F32 + F32 * MAX_NR_PIXELS;
pub const IRRADIANCE_SIZE: usize = SPECTRUM_CALIBRATION_SIZE + U8 + U32;
pub const TRIGGER_SIZE: usize = U8 * 3;
pub const MEAS_CONFIG_SIZE: usize = U16
    + U16
    + F32
    + U32
    + U32
    + DARK_CORRECTION_SIZE
    + SMOOTHING_SIZE
    + U8
    + TRIGGER_SIZE
    + CONTROL_SETTINGS_SIZE;
pub const TIME_STAMP_SIZE: usize = U16 + U16;
pub const SD_CARD_SIZE: usize = U8 + U8 + ROOT_NAME_LEN + TIME_STAMP_SIZE;
pub const SPECTRUM_CORRECTION_SIZE: usize = F32 * MAX_NR_PIXELS;
pub const STAND_ALONE_SIZE: usize = U8 + MEAS_CONFIG_SIZE + U16 + SD_CARD_SIZE;
pub const TEMP_SENSOR_SIZE: usize = F32 * NR_TEMP_POL_COEF;
pub const TEC_CONTROL_SIZE: usize = U8 + F32 + F32 * NR_DAC_POL_COEF;
pub const PROCESS_CONTROL_SIZE: usize =
    F32 * NR_ANALOG_LIMITS * 2 + F32 * NR_DIGITAL_LIMITS * 2;

/// Полезная часть DeviceConfigType без резерва.
const DEVICE_CONFIG_FIELDS_SIZE: usize = U16
    + U16
    + USER_ID_LEN
    + DETECTOR_SIZE
    + IRRADIANCE_SIZE
    + SPECTRUM_CALIBRATION_SIZE
    + SPECTRUM_CORRECTION_SIZE
    + STAND_ALONE_SIZE
    + TEMP_SENSOR_SIZE * MAX_TEMP_SENSORS
    + TEC_CONTROL_SIZE
    + PROCESS_CONTROL_SIZE;

/// Длина резерва в конце DeviceConfigType
pub const SETTINGS_RESERVED_LEN: usize = 62 * 1024 - U32 - DEVICE_CONFIG_FIELDS_SIZE;

/// Полный размер DeviceConfigType
pub const DEVICE_CONFIG_SIZE: usize = DEVICE_CONFIG_FIELDS_SIZE + SETTINGS_RESERVED_LEN;

pub const IDENTITY_SIZE: usize = AVS_SERIAL_LEN + USER_ID_LEN + U8;
