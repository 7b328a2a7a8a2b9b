pub mod channel;
pub mod message_log;
pub mod twilio;

pub use channel::{MockSmsChannel, NotificationChannel, SentMessage};
pub use message_log::MessageLog;
pub use twilio::TwilioSmsClient;
