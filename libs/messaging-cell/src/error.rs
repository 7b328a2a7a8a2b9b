use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Provider rejected message: status {status}: {detail}")]
    ProviderRejected { status: u16, detail: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Channel not configured: {0}")]
    NotConfigured(String),
}
