//! OAuth sign-in against the Microsoft identity platform.

mod device_code;

pub use device_code::{
    AccessToken, AuthError, DeviceCodeAuthenticator, DeviceCodeSession, PollOutcome,
    DEFAULT_AUTHORITY, DEFAULT_CLIENT_ID, DEFAULT_SCOPE,
};
