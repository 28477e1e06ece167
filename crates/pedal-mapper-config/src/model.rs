//! Configuration data model

/// Default USB vendor id (Elgato)
pub const DEFAULT_VENDOR_ID: u16 = 0x0FD9;

/// Default USB product id (Stream Deck Pedal)
pub const DEFAULT_PRODUCT_ID: u16 = 0x0086;

/// Default HID poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub pedal: PedalConfig,
}

/// Global settings
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// Upper bound on a single HID read, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Which physical pedal to open and how to present the virtual keyboard
#[derive(Debug, Clone)]
pub struct PedalConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Name the uinput device is registered under
    pub virtual_device_name: String,
}

impl PedalConfig {
    /// Get vendor:product string (e.g., "0fd9:0086")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl Default for PedalConfig {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            virtual_device_name: "Pedal Mapper Virtual Input".to_string(),
        }
    }
}
