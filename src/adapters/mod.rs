//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                      | Connects to                 |
//! |------------|---------------------------------|-----------------------------|
//! | `hardware` | SensorDriver                    | ESP32 ADC1 oneshot          |
//! | `log_sink` | EventSink                       | Serial log output           |
//! | `network`  | NetworkPort                     | WiFi STA, SNTP, HTTP client |
//! | `nvs`      | PersistentStore, ConfigPort     | NVS blob / in-memory image  |
//! | `power`    | PowerPort                       | RTC timer + deep sleep      |
//! | `time`     | ClockPort, MonotonicClock       | esp_timer, gettimeofday     |

pub mod hardware;
pub mod log_sink;
pub mod network;
pub mod nvs;
pub mod power;
pub mod time;
