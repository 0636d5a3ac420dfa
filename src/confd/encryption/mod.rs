//! Encryption endpoint: active key state, the literal form-data
//! stripping rule, and the operations behind `/encrypt`, `/decrypt`,
//! `/key`, `/encrypt/status`.

mod formdata;
mod key;
mod service;

pub use key::{AesEncryptor, RsaEncryptor, TextEncryptor};
pub use service::EncryptionService;
