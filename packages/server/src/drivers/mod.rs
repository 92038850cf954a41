pub mod echo;
pub mod http;
pub mod sms;
pub mod telegram;

pub use echo::EchoDriver;
pub use http::HttpDriver;
pub use sms::SmsDriver;
pub use telegram::TelegramDriver;
