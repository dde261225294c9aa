use crate::settings::Settings;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{error::TrySendError, Sender};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    RotateAsset,
    RotateOrientation,
    ToggleInvert,
    RotateFiat,
}

impl Button {
    /// Maps the BCM pin the key is wired to.
    pub fn from_pin(pin: u8) -> Option<Self> {
        match pin {
            5 => Some(Button::RotateAsset),
            6 => Some(Button::RotateOrientation),
            13 => Some(Button::ToggleInvert),
            19 => Some(Button::RotateFiat),
            _ => None,
        }
    }

    pub fn apply(self, settings: &mut Settings) {
        match self {
            Button::RotateAsset => settings.rotate_assets(),
            Button::RotateOrientation => {
                settings.display.orientation = (settings.display.orientation + 90) % 360
            }
            Button::ToggleInvert => settings.display.inverted = !settings.display.inverted,
            Button::RotateFiat => settings.rotate_fiats(),
        }
    }
}

impl FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(pin) = s.parse::<u8>() {
            return Button::from_pin(pin).ok_or_else(|| format!("no key on pin {}", pin));
        }
        match s.to_lowercase().as_str() {
            "asset" | "a" => Ok(Button::RotateAsset),
            "orientation" | "o" => Ok(Button::RotateOrientation),
            "invert" | "i" => Ok(Button::ToggleInvert),
            "fiat" | "f" => Ok(Button::RotateFiat),
            other => Err(format!("unknown key {:?}", other)),
        }
    }
}

/// Idle/Refreshing flag shared between the control loop and button sources.
#[derive(Debug, Clone, Default)]
pub struct RefreshGuard(Arc<AtomicBool>);

/// Held for the duration of a refresh; returns the guard to Idle on drop.
#[derive(Debug)]
pub struct Refreshing(Arc<AtomicBool>);

impl RefreshGuard {
    pub fn try_acquire(&self) -> Option<Refreshing> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Refreshing(self.0.clone()))
    }

    pub fn is_refreshing(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Drop for Refreshing {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Forwards a press unless a refresh is running or one is already queued.
pub fn press(sender: &Sender<Button>, guard: &RefreshGuard, button: Button) -> bool {
    if guard.is_refreshing() {
        debug!(?button, "Refresh in progress, ignoring key");
        return false;
    }
    match sender.try_send(button) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!(?button, "Key already queued, ignoring");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Reads key names or pin numbers from stdin, one per line.
pub async fn listen_stdin(sender: Sender<Button>, guard: RefreshGuard) {
    info!("Listening for keys on stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match line.parse::<Button>() {
                Ok(button) => {
                    press(&sender, &guard, button);
                }
                Err(e) => warn!("{}", e),
            },
            Ok(None) => {
                debug!("stdin closed");
                return;
            }
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                return;
            }
        }
        if sender.is_closed() {
            return;
        }
    }
}
