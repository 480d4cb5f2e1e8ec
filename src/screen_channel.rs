//! Contract of the Android method channel the app uses to toggle window
//! flags while a test is on screen (no screenshots, screen kept awake).

use std::str::FromStr;

pub const CHANNEL: &str = "com.kaduacademy.app/secure_screen";

/// `WindowManager.LayoutParams.FLAG_SECURE`
pub const FLAG_SECURE: u32 = 0x0000_2000;
/// `WindowManager.LayoutParams.FLAG_KEEP_SCREEN_ON`
pub const FLAG_KEEP_SCREEN_ON: u32 = 0x0000_0080;

pub trait WindowFlags {
    fn add_flags(&mut self, flags: u32);
    fn clear_flags(&mut self, flags: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMethod {
    SetSecureScreen,
    ClearSecureScreen,
    SetKeepScreenOn,
    ClearKeepScreenOn,
}

impl FromStr for ScreenMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setSecureScreen" => Ok(ScreenMethod::SetSecureScreen),
            "clearSecureScreen" => Ok(ScreenMethod::ClearSecureScreen),
            "setKeepScreenOn" => Ok(ScreenMethod::SetKeepScreenOn),
            "clearKeepScreenOn" => Ok(ScreenMethod::ClearKeepScreenOn),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodResult {
    /// Acknowledged with an empty payload.
    Success,
    NotImplemented,
}

impl ScreenMethod {
    pub fn apply<W: WindowFlags>(self, window: &mut W) {
        match self {
            ScreenMethod::SetSecureScreen => window.add_flags(FLAG_SECURE),
            ScreenMethod::ClearSecureScreen => window.clear_flags(FLAG_SECURE),
            ScreenMethod::SetKeepScreenOn => window.add_flags(FLAG_KEEP_SCREEN_ON),
            ScreenMethod::ClearKeepScreenOn => window.clear_flags(FLAG_KEEP_SCREEN_ON),
        }
    }
}

pub fn handle_method_call<W: WindowFlags>(method: &str, window: &mut W) -> MethodResult {
    match method.parse::<ScreenMethod>() {
        Ok(m) => {
            m.apply(window);
            MethodResult::Success
        }
        Err(()) => MethodResult::NotImplemented,
    }
}
