//! Драйвер поверх библиотеки производителя.
//!
//! Значения переводятся в упакованные структуры `avaspec-sys` через кодек
//! `avaspec-core`, поэтому раскладка в памяти совпадает с заголовком
//! независимо от порядка полей в типах Rust.

use std::os::raw::{c_char, c_long, c_short, c_uint, c_ulong, c_ushort};

use avaspec_core::{
    decode_fixed_str, decode_identity_list, encode_fixed_raw, encode_fixed_str, Wire,
};
use avaspec_sys as sys;
use avaspec_sys::Packed;
use avaspec_types::{
    check, AvsError, AvsHandle, AvsIdentity, AvsResult, AvsStatus, DeviceConfig, InitPort,
    MeasConfig, ScopeData, SdCard, TimeStamp, VersionInfo, DEVICE_CONFIG_SIZE, IDENTITY_SIZE,
    ROOT_NAME_LEN, SD_NAME_LEN, VERSION_LEN,
};
use log::debug;

use crate::AvsDriver;

/// Драйвер библиотеки AS5216 (`as5216.dll` / `libas5216.so`).
pub struct As5216Driver {
    /// Кол-во пикселей в последнем `prepare_measure`, по хэндлам
    prepared: Vec<(AvsHandle, usize)>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl As5216Driver {
    pub fn new() -> Self {
        Self {
            prepared: Vec::new(),
        }
    }

    fn prepared_pixels(
        &self,
        handle: AvsHandle,
    ) -> AvsResult<usize> {
        self.prepared
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, n)| *n)
            .ok_or(AvsError::status(AvsStatus::InvalidState))
    }

    fn forget(
        &mut self,
        handle: AvsHandle,
    ) {
        self.prepared.retain(|(h, _)| *h != handle);
    }
}

impl Default for As5216Driver {
    fn default() -> Self {
        Self::new()
    }
}

fn raw(handle: AvsHandle) -> sys::AvsHandle {
    handle.raw() as sys::AvsHandle
}

/// Результат C++ `bool`: ненулевое значение - успех.
fn check_bool(
    ok: u8,
    what: &str,
) -> AvsResult<()> {
    if ok == 0 {
        return Err(AvsError::OperationFailed(what.to_string()));
    }
    Ok(())
}

/// Имя SD карты в буфере из `SD_NAME_LEN` байт с завершающим NUL.
fn name_buffer(name: &str) -> AvsResult<Vec<u8>> {
    encode_fixed_str(name, SD_NAME_LEN - 1).map(|mut buf| {
        buf.push(0);
        buf
    })
}

/// Результат `AVS_GetFirst*`/`AVS_GetNext*`: пустое имя - конец списка.
fn listed_name(buf: &[u8]) -> Option<String> {
    let name = decode_fixed_str(buf);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn pack<T: Packed, W: Wire>(value: &W) -> AvsResult<T> {
    let bytes = value.to_bytes()?;
    T::from_packed_bytes(&bytes).ok_or(AvsError::Truncated {
        needed: std::mem::size_of::<T>(),
        found: bytes.len(),
    })
}

////////////////////////////////////////////////////////////////////////////////
// AvsDriver
////////////////////////////////////////////////////////////////////////////////

impl AvsDriver for As5216Driver {
    fn name(&self) -> &'static str {
        "as5216"
    }

    fn init(
        &mut self,
        port: InitPort,
    ) -> AvsResult<usize> {
        debug!("AVS_Init({})", port.as_raw());
        // SAFETY: функция без указателей
        let count = check(unsafe { sys::AVS_Init(port.as_raw() as c_short) })?;
        Ok(count as usize)
    }

    fn done(&mut self) -> AvsResult<()> {
        debug!("AVS_Done");
        self.prepared.clear();
        // SAFETY: функция без аргументов
        check(unsafe { sys::AVS_Done() })?;
        Ok(())
    }

    fn nr_of_devices(&mut self) -> AvsResult<usize> {
        debug!("AVS_GetNrOfDevices");
        // SAFETY: функция без аргументов
        let count = check(unsafe { sys::AVS_GetNrOfDevices() })?;
        Ok(count as usize)
    }

    fn list(&mut self) -> AvsResult<Vec<AvsIdentity>> {
        let mut required: c_uint = 0;
        let mut entries = 1usize;

        // Первый вызов узнаёт нужный размер, второй заполняет список
        for _ in 0..2 {
            let mut list = vec![sys::AvsIdentityType::zeroed(); entries];
            let size = (entries * IDENTITY_SIZE) as c_uint;
            debug!("AVS_GetList(size={size})");

            // SAFETY: буфер list вмещает size байт
            let code = unsafe { sys::AVS_GetList(size, &mut required, list.as_mut_ptr()) };

            if code == AvsStatus::InvalidSize.code() {
                entries = (required as usize).div_ceil(IDENTITY_SIZE).max(1);
                continue;
            }

            let count = check(code)? as usize;
            let bytes: Vec<u8> = list
                .iter()
                .take(count)
                .flat_map(|id| id.as_packed_bytes().to_vec())
                .collect();
            return decode_identity_list(&bytes);
        }

        Err(AvsError::status(AvsStatus::InvalidSize))
    }

    fn activate(
        &mut self,
        identity: &AvsIdentity,
    ) -> AvsResult<AvsHandle> {
        let mut id: sys::AvsIdentityType = pack(identity)?;
        debug!("AVS_Activate({})", identity.serial_number);

        // SAFETY: id - корректная упакованная структура
        let handle = AvsHandle(unsafe { sys::AVS_Activate(&mut id) } as i64);
        if !handle.is_valid() {
            return Err(AvsError::InvalidHandle(identity.serial_number.to_string()));
        }
        Ok(handle)
    }

    fn deactivate(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<()> {
        debug!("AVS_Deactivate({handle})");
        self.forget(handle);
        // SAFETY: функция без указателей
        check_bool(
            unsafe { sys::AVS_Deactivate(raw(handle)) },
            &format!("AVS_Deactivate({handle})"),
        )
    }

    fn handle_from_serial(
        &mut self,
        serial: &str,
    ) -> AvsResult<AvsHandle> {
        let mut buf = encode_fixed_str(serial, avaspec_types::AVS_SERIAL_LEN)?;
        buf.push(0);
        debug!("AVS_GetHandleFromSerial({serial})");

        // SAFETY: буфер завершён NUL
        let handle = AvsHandle(unsafe {
            sys::AVS_GetHandleFromSerial(buf.as_mut_ptr() as *mut c_char)
        } as i64);
        if !handle.is_valid() {
            return Err(AvsError::InvalidHandle(serial.to_string()));
        }
        Ok(handle)
    }

    fn prepare_measure(
        &mut self,
        handle: AvsHandle,
        meas: &MeasConfig,
    ) -> AvsResult<()> {
        let mut packed: sys::MeasConfigType = pack(meas)?;
        debug!(
            "AVS_PrepareMeasure({handle}, pixels {}..={}, {} ms x {})",
            meas.start_pixel, meas.stop_pixel, meas.integration_time, meas.nr_averages
        );

        // SAFETY: packed - корректная упакованная структура
        check(unsafe { sys::AVS_PrepareMeasure(raw(handle), &mut packed) })?;

        self.forget(handle);
        self.prepared.push((handle, meas.pixel_count()));
        Ok(())
    }

    fn measure(
        &mut self,
        handle: AvsHandle,
        nmsr: i16,
    ) -> AvsResult<()> {
        debug!("AVS_Measure({handle}, {nmsr})");
        // SAFETY: окно уведомлений не используется (0)
        check(unsafe { sys::AVS_Measure(raw(handle), 0 as c_long, nmsr as c_short) })?;
        Ok(())
    }

    fn poll_scan(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<bool> {
        // SAFETY: функция без указателей
        let code = check(unsafe { sys::AVS_PollScan(raw(handle)) })?;
        Ok(code == 1)
    }

    fn stop_measure(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<()> {
        debug!("AVS_StopMeasure({handle})");
        // SAFETY: функция без указателей
        check(unsafe { sys::AVS_StopMeasure(raw(handle)) })?;
        Ok(())
    }

    fn lambda(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Vec<f64>> {
        let pixels = self.num_pixels(handle)? as usize;
        let mut out = vec![0f64; pixels];
        debug!("AVS_GetLambda({handle})");

        // SAFETY: буфер на num_pixels значений
        check(unsafe { sys::AVS_GetLambda(raw(handle), out.as_mut_ptr()) })?;
        Ok(out)
    }

    fn num_pixels(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<u16> {
        let mut pixels: c_ushort = 0;
        // SAFETY: pixels живёт до конца вызова
        check(unsafe { sys::AVS_GetNumPixels(raw(handle), &mut pixels) })?;
        Ok(pixels)
    }

    fn scope_data(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<ScopeData> {
        let pixels = self.prepared_pixels(handle)?;
        let mut time_label: c_uint = 0;
        let mut values = vec![0f64; pixels];

        // SAFETY: буфер на весь подготовленный диапазон пикселей
        check(unsafe {
            sys::AVS_GetScopeData(raw(handle), &mut time_label, values.as_mut_ptr())
        })?;

        Ok(ScopeData { time_label, values })
    }

    fn saturated_pixels(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Vec<u8>> {
        let pixels = self.prepared_pixels(handle)?;
        let mut saturated = vec![0u8; pixels];

        // SAFETY: буфер на весь подготовленный диапазон пикселей
        check(unsafe { sys::AVS_GetSaturatedPixels(raw(handle), saturated.as_mut_ptr()) })?;
        Ok(saturated)
    }

    fn analog_in(
        &mut self,
        handle: AvsHandle,
        id: u8,
    ) -> AvsResult<f32> {
        let mut value = 0f32;
        // SAFETY: value живёт до конца вызова
        check(unsafe { sys::AVS_GetAnalogIn(raw(handle), id, &mut value) })?;
        Ok(value)
    }

    fn digital_in(
        &mut self,
        handle: AvsHandle,
        id: u8,
    ) -> AvsResult<u8> {
        let mut value = 0u8;
        // SAFETY: value живёт до конца вызова
        check(unsafe { sys::AVS_GetDigIn(raw(handle), id, &mut value) })?;
        Ok(value)
    }

    fn set_analog_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        volts: f32,
    ) -> AvsResult<()> {
        debug!("AVS_SetAnalogOut({handle}, {port}, {volts})");
        // SAFETY: функция без указателей
        check(unsafe { sys::AVS_SetAnalogOut(raw(handle), port, volts) })?;
        Ok(())
    }

    fn set_digital_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        state: u8,
    ) -> AvsResult<()> {
        debug!("AVS_SetDigOut({handle}, {port}, {state})");
        // SAFETY: функция без указателей
        check(unsafe { sys::AVS_SetDigOut(raw(handle), port, state) })?;
        Ok(())
    }

    fn set_pwm_out(
        &mut self,
        handle: AvsHandle,
        port: u8,
        freq_hz: u32,
        duty_percent: u8,
    ) -> AvsResult<()> {
        debug!("AVS_SetPwmOut({handle}, {port}, {freq_hz} Hz, {duty_percent}%)");
        // SAFETY: функция без указателей
        check(unsafe {
            sys::AVS_SetPwmOut(raw(handle), port, freq_hz as c_ulong, duty_percent)
        })?;
        Ok(())
    }

    fn version_info(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<VersionInfo> {
        let mut fpga = [0u8; VERSION_LEN];
        let mut firmware = [0u8; VERSION_LEN];
        let mut dll = [0u8; VERSION_LEN];

        // SAFETY: три буфера по VERSION_LEN байт
        check(unsafe {
            sys::AVS_GetVersionInfo(
                raw(handle),
                fpga.as_mut_ptr() as *mut c_char,
                firmware.as_mut_ptr() as *mut c_char,
                dll.as_mut_ptr() as *mut c_char,
            )
        })?;

        Ok(VersionInfo {
            fpga: decode_fixed_str(&fpga),
            firmware: decode_fixed_str(&firmware),
            dll: decode_fixed_str(&dll),
        })
    }

    fn parameter(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<DeviceConfig> {
        let mut config = Box::new(sys::DeviceConfigType::zeroed());
        let mut required: c_uint = 0;
        debug!("AVS_GetParameter({handle})");

        // SAFETY: структура ровно DEVICE_CONFIG_SIZE байт
        let code = unsafe {
            sys::AVS_GetParameter(
                raw(handle),
                DEVICE_CONFIG_SIZE as c_uint,
                &mut required,
                config.as_mut(),
            )
        };

        if code == AvsStatus::InvalidSize.code() {
            // Размер блока фиксирован, другой ответ означает другую версию библиотеки
            return Err(AvsError::format_violation(format!(
                "library requires {required} bytes for DeviceConfigType, expected {DEVICE_CONFIG_SIZE}"
            )));
        }
        check(code)?;

        DeviceConfig::from_bytes(config.as_packed_bytes())
    }

    fn set_parameter(
        &mut self,
        handle: AvsHandle,
        config: &DeviceConfig,
    ) -> AvsResult<()> {
        let bytes = config.to_bytes()?;
        let mut packed = Box::new(
            sys::DeviceConfigType::from_packed_bytes(&bytes).ok_or(AvsError::Truncated {
                needed: DEVICE_CONFIG_SIZE,
                found: bytes.len(),
            })?,
        );
        debug!("AVS_SetParameter({handle})");

        // SAFETY: packed - корректная упакованная структура
        check(unsafe { sys::AVS_SetParameter(raw(handle), packed.as_mut()) })?;
        Ok(())
    }

    fn set_sync_mode(
        &mut self,
        handle: AvsHandle,
        enable: bool,
    ) -> AvsResult<()> {
        debug!("AVS_SetSyncMode({handle}, {enable})");
        // SAFETY: функция без указателей
        check(unsafe { sys::AVS_SetSyncMode(raw(handle), enable as u8) })?;
        Ok(())
    }

    fn set_prescan_mode(
        &mut self,
        handle: AvsHandle,
        prescan: bool,
    ) -> AvsResult<()> {
        debug!("AVS_SetPrescanMode({handle}, {prescan})");
        // SAFETY: функция без указателей
        check(unsafe { sys::AVS_SetPrescanMode(raw(handle), prescan as u8) })?;
        Ok(())
    }

    fn use_high_res_adc(
        &mut self,
        handle: AvsHandle,
        enable: bool,
    ) -> AvsResult<()> {
        debug!("AVS_UseHighResAdc({handle}, {enable})");
        // SAFETY: функция без указателей
        check(unsafe { sys::AVS_UseHighResAdc(raw(handle), enable as u8) })?;
        Ok(())
    }

    fn set_sensitivity_mode(
        &mut self,
        handle: AvsHandle,
        mode: u32,
    ) -> AvsResult<()> {
        debug!("AVS_SetSensitivityMode({handle}, {mode})");
        // SAFETY: функция без указателей
        check(unsafe { sys::AVS_SetSensitivityMode(raw(handle), mode) })?;
        Ok(())
    }

    fn save_spectra_to_sd_card(
        &mut self,
        handle: AvsHandle,
        sd: &SdCard,
    ) -> AvsResult<()> {
        let mut root = encode_fixed_raw(&sd.file_root_name, ROOT_NAME_LEN)?;
        let stamp: sys::TimeStampType = pack::<_, TimeStamp>(&sd.timestamp)?;
        debug!(
            "AVS_SaveSpectraToSDCard({handle}, {}, {}, {})",
            sd.enable, sd.spectrum_type, sd.file_root_name
        );

        // SAFETY: root - буфер char[ROOT_NAME_LEN]
        check(unsafe {
            sys::AVS_SaveSpectraToSDCard(
                raw(handle),
                sd.enable as u8,
                sd.spectrum_type,
                root.as_mut_ptr() as *mut c_char,
                stamp,
            )
        })?;
        Ok(())
    }

    fn file_size(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<u32> {
        let mut buf = name_buffer(name)?;
        let mut size: c_uint = 0;

        // SAFETY: имя завершено NUL
        check(unsafe {
            sys::AVS_GetFileSize(raw(handle), buf.as_mut_ptr() as *mut c_char, &mut size)
        })?;
        Ok(size)
    }

    fn read_file(
        &mut self,
        handle: AvsHandle,
        name: &str,
        size: u32,
    ) -> AvsResult<Vec<u8>> {
        let mut buf = name_buffer(name)?;
        let mut dest = vec![0u8; size as usize];
        debug!("AVS_GetFile({handle}, {name}, {size})");

        // SAFETY: dest вмещает size байт, имя завершено NUL
        check(unsafe {
            sys::AVS_GetFile(
                raw(handle),
                buf.as_mut_ptr() as *mut c_char,
                dest.as_mut_ptr(),
                size,
            )
        })?;
        Ok(dest)
    }

    fn first_file(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Option<String>> {
        let mut next = [0u8; SD_NAME_LEN];
        // SAFETY: буфер не меньше 14 байт
        check(unsafe { sys::AVS_GetFirstFile(raw(handle), next.as_mut_ptr() as *mut c_char) })?;
        Ok(listed_name(&next))
    }

    fn next_file(
        &mut self,
        handle: AvsHandle,
        prev: &str,
    ) -> AvsResult<Option<String>> {
        let mut prev = name_buffer(prev)?;
        let mut next = [0u8; SD_NAME_LEN];

        // SAFETY: оба буфера не меньше 14 байт
        check(unsafe {
            sys::AVS_GetNextFile(
                raw(handle),
                prev.as_mut_ptr() as *mut c_char,
                next.as_mut_ptr() as *mut c_char,
            )
        })?;
        Ok(listed_name(&next))
    }

    fn delete_file(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()> {
        let mut buf = name_buffer(name)?;
        debug!("AVS_DeleteFile({handle}, {name})");

        // SAFETY: имя завершено NUL
        check(unsafe { sys::AVS_DeleteFile(raw(handle), buf.as_mut_ptr() as *mut c_char) })?;
        Ok(())
    }

    fn first_directory(
        &mut self,
        handle: AvsHandle,
    ) -> AvsResult<Option<String>> {
        let mut next = [0u8; SD_NAME_LEN];
        // SAFETY: буфер не меньше 14 байт
        check(unsafe {
            sys::AVS_GetFirstDirectory(raw(handle), next.as_mut_ptr() as *mut c_char)
        })?;
        Ok(listed_name(&next))
    }

    fn next_directory(
        &mut self,
        handle: AvsHandle,
        prev: &str,
    ) -> AvsResult<Option<String>> {
        let mut prev = name_buffer(prev)?;
        let mut next = [0u8; SD_NAME_LEN];

        // SAFETY: оба буфера не меньше 14 байт
        check(unsafe {
            sys::AVS_GetNextDirectory(
                raw(handle),
                prev.as_mut_ptr() as *mut c_char,
                next.as_mut_ptr() as *mut c_char,
            )
        })?;
        Ok(listed_name(&next))
    }

    fn delete_directory(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()> {
        let mut buf = name_buffer(name)?;
        debug!("AVS_DeleteDirectory({handle}, {name})");

        // SAFETY: имя завершено NUL
        check(unsafe {
            sys::AVS_DeleteDirectory(raw(handle), buf.as_mut_ptr() as *mut c_char)
        })?;
        Ok(())
    }

    fn set_directory(
        &mut self,
        handle: AvsHandle,
        name: &str,
    ) -> AvsResult<()> {
        let mut buf = encode_fixed_str(name, ROOT_NAME_LEN)?;
        debug!("AVS_SetDirectory({handle}, {name})");

        // SAFETY: буфер char[ROOT_NAME_LEN]
        check(unsafe { sys::AVS_SetDirectory(raw(handle), buf.as_mut_ptr() as *mut c_char) })?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
