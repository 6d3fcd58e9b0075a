//! Пределы и константы интерфейса AS5216.
//!
//! Значения совпадают с заголовком библиотеки производителя и не должны
//! меняться: от них зависят размеры структур, передаваемых в прибор.

/// Длина пользовательского имени устройства (байт)
pub const USER_ID_LEN: usize = 64;
/// Кол-во коэффициентов полинома длины волны
pub const NR_WAVELEN_POL_COEF: usize = 5;
/// Кол-во коэффициентов полинома нелинейности
pub const NR_NONLIN_POL_COEF: usize = 8;
/// Размер списка дефектных пикселей
pub const NR_DEFECTIVE_PIXELS: usize = 30;
/// Максимальное число пикселей детектора
pub const MAX_NR_PIXELS: usize = 4096;
/// Кол-во коэффициентов полинома термодатчика
pub const NR_TEMP_POL_COEF: usize = 5;
/// Кол-во термодатчиков
pub const MAX_TEMP_SENSORS: usize = 3;
/// Длина корня имени файла на SD карте
pub const ROOT_NAME_LEN: usize = 6;
/// Длина серийного номера
pub const AVS_SERIAL_LEN: usize = 10;
/// Максимальное значение пикселя (всё выше считается насыщением)
pub const MAX_PIXEL_VALUE: u16 = 0xFFFC;
/// Кол-во видеоканалов АЦП
pub const MAX_VIDEO_CHANNELS: usize = 2;
/// Максимальная длительность импульса лазера
pub const MAX_LASER_WIDTH: u32 = 0xFFFF;

pub const HW_TRIGGER_MODE: u8 = 1;
pub const SW_TRIGGER_MODE: u8 = 0;
pub const EDGE_TRIGGER_SOURCE: u8 = 0;
pub const LEVEL_TRIGGER_SOURCE: u8 = 1;
pub const MAX_TRIGGER_MODE: u8 = 1;
pub const MAX_TRIGGER_SOURCE: u8 = 1;
pub const MAX_TRIGGER_SOURCE_TYPE: u8 = 1;

/// Максимальное время интегрирования, мс (600 секунд)
pub const MAX_INTEGRATION_TIME: u32 = 600_000;

pub const SAT_DISABLE_DET: u8 = 0;
pub const SAT_ENABLE_DET: u8 = 1;
pub const SAT_PEAK_INVERSION: u8 = 2;

/// Кол-во коэффициентов ЦАП термоэлектрического охладителя
pub const NR_DAC_POL_COEF: usize = 2;

/// Идентификаторы термодатчиков
pub const NTC1_ID: u8 = 0;
pub const NTC2_ID: u8 = 1;
pub const TEC_ID: u8 = 2;

/// Смещение, которое библиотека добавляет к коду ненастроенного устройства
pub const UNCONFIGURED_DEVICE_OFFSET: i32 = 256;
/// Значение, возвращаемое `AVS_Activate` при ошибке
pub const INVALID_AVS_HANDLE_VALUE: i64 = 1000;

/// Размер буферов строк версий в `AVS_GetVersionInfo`
pub const VERSION_LEN: usize = 16;
/// Минимальный буфер под имя файла SD карты (8.3 + NUL)
pub const SD_NAME_LEN: usize = 14;
/// Кол-во аналоговых пределов в ProcessControl
pub const NR_ANALOG_LIMITS: usize = 2;
/// Кол-во цифровых пределов в ProcessControl
pub const NR_DIGITAL_LIMITS: usize = 10;

/// Шаг метки времени спектра (мс)
pub const TIME_LABEL_TICK_MS: u32 = 10;
