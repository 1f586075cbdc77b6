use crate::prelude::{CoreError, CoreResult};
use gpiocdev::line::Value;
use gpiocdev::Request;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reads the current level of a digital input line.
pub trait LineReader: Send {
    fn read_level(&mut self) -> CoreResult<bool>;
}

/// Input line requested from a GPIO character device (`/dev/gpiochipN`).
pub struct CdevGpioLine {
    offset: u32,
    request: Request,
}

impl CdevGpioLine {
    pub fn open<P: AsRef<Path>>(chip: P, offset: u32) -> CoreResult<Self> {
        let chip = chip.as_ref();
        let request = Request::builder()
            .on_chip(chip)
            .with_consumer("launch-monitor")
            .with_line(offset)
            .as_input()
            .request()
            .map_err(|err| {
                CoreError::HardwareUnavailable(format!(
                    "requesting line {} on {}: {}",
                    offset,
                    chip.display(),
                    err
                ))
            })?;
        Ok(Self { offset, request })
    }
}

impl LineReader for CdevGpioLine {
    fn read_level(&mut self) -> CoreResult<bool> {
        let value = self
            .request
            .value(self.offset)
            .map_err(|err| CoreError::TransientRead(format!("GPIO {}: {}", self.offset, err)))?;
        Ok(value == Value::Active)
    }
}

/// GPIO line under `/sys/class/gpio`. Opening exports the pin when needed
/// and sets it as an input.
pub struct SysfsGpioLine {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsGpioLine {
    pub fn open(pin: u32) -> CoreResult<Self> {
        Self::open_in("/sys/class/gpio", pin)
    }

    pub fn open_in<P: AsRef<Path>>(root: P, pin: u32) -> CoreResult<Self> {
        let root = root.as_ref();
        let line_dir = root.join(format!("gpio{}", pin));
        if !line_dir.is_dir() {
            fs::write(root.join("export"), pin.to_string()).map_err(|err| {
                CoreError::HardwareUnavailable(format!("exporting GPIO {}: {}", pin, err))
            })?;
        }

        let direction = line_dir.join("direction");
        if direction.exists() {
            fs::write(&direction, "in").map_err(|err| {
                CoreError::HardwareUnavailable(format!("setting GPIO {} as input: {}", pin, err))
            })?;
        }

        let value_path = line_dir.join("value");
        if !value_path.exists() {
            return Err(CoreError::HardwareUnavailable(format!(
                "GPIO line {} has no value attribute",
                pin
            )));
        }
        Ok(Self { pin, value_path })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }
}

impl LineReader for SysfsGpioLine {
    fn read_level(&mut self) -> CoreResult<bool> {
        let raw = fs::read_to_string(&self.value_path).map_err(|err| {
            CoreError::TransientRead(format!("GPIO {}: {}", self.pin, err))
        })?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(CoreError::TransientRead(format!(
                "GPIO {} returned {:?}",
                self.pin, other
            ))),
        }
    }
}

/// Line whose level is set by the owner of a cloned handle.
#[derive(Clone, Default)]
pub struct SimulatedLine {
    level: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl SimulatedLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&self, active: bool) {
        self.level.store(active, Ordering::SeqCst);
    }

    /// Makes every subsequent read fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl LineReader for SimulatedLine {
    fn read_level(&mut self) -> CoreResult<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::TransientRead("simulated line failure".into()));
        }
        Ok(self.level.load(Ordering::SeqCst))
    }
}
