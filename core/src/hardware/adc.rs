use crate::prelude::{CoreError, CoreResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Blocking single-sample ADC read.
pub trait AdcReader: Send {
    fn read_sample(&mut self, channel: u32) -> CoreResult<u16>;
}

/// ADC exposed through the Linux IIO subsystem (e.g. an MCP3008 bound to the
/// `mcp320x` driver), one `in_voltage{N}_raw` file per channel.
///
/// Channel files stay open between reads; each read rewinds and re-reads the
/// attribute. A handle that fails is dropped and reopened on the next read.
pub struct IioAdc {
    device: PathBuf,
    channels: HashMap<u32, File>,
    buffer: String,
}

impl IioAdc {
    pub fn open<P: AsRef<Path>>(device: P) -> CoreResult<Self> {
        let device = device.as_ref().to_path_buf();
        if !device.is_dir() {
            return Err(CoreError::HardwareUnavailable(format!(
                "IIO device {} not found",
                device.display()
            )));
        }
        Ok(Self {
            device,
            channels: HashMap::new(),
            buffer: String::with_capacity(8),
        })
    }

    fn channel_path(&self, channel: u32) -> PathBuf {
        self.device.join(format!("in_voltage{}_raw", channel))
    }

    fn read_raw(&mut self, channel: u32) -> std::io::Result<()> {
        if !self.channels.contains_key(&channel) {
            let file = File::open(self.channel_path(channel))?;
            self.channels.insert(channel, file);
        }
        self.buffer.clear();
        if let Some(file) = self.channels.get_mut(&channel) {
            file.seek(SeekFrom::Start(0))?;
            file.read_to_string(&mut self.buffer)?;
        }
        Ok(())
    }
}

impl AdcReader for IioAdc {
    fn read_sample(&mut self, channel: u32) -> CoreResult<u16> {
        if let Err(err) = self.read_raw(channel) {
            self.channels.remove(&channel);
            return Err(CoreError::TransientRead(format!(
                "reading {}: {}",
                self.channel_path(channel).display(),
                err
            )));
        }
        let raw = self.buffer.trim();
        raw.parse::<u16>().map_err(|err| {
            CoreError::TransientRead(format!(
                "parsing {:?} from {}: {}",
                raw,
                self.channel_path(channel).display(),
                err
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn iio_adc_reads_channel_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in_voltage2_raw"), "613\n").unwrap();
        let mut adc = IioAdc::open(dir.path()).unwrap();
        assert_eq!(adc.read_sample(2).unwrap(), 613);
    }

    #[test]
    fn iio_adc_rereads_through_open_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in_voltage0_raw");
        fs::write(&path, "1000\n").unwrap();
        let mut adc = IioAdc::open(dir.path()).unwrap();
        assert_eq!(adc.read_sample(0).unwrap(), 1000);
        assert_eq!(adc.channels.len(), 1);

        fs::write(&path, "7\n").unwrap();
        assert_eq!(adc.read_sample(0).unwrap(), 7);
        assert_eq!(adc.read_sample(0).unwrap(), 7);
        assert_eq!(adc.channels.len(), 1);
    }

    #[test]
    fn iio_adc_reports_transient_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in_voltage0_raw"), "garbage").unwrap();
        let mut adc = IioAdc::open(dir.path()).unwrap();
        assert!(matches!(adc.read_sample(0), Err(CoreError::TransientRead(_))));
        assert!(matches!(adc.read_sample(5), Err(CoreError::TransientRead(_))));
        assert!(!adc.channels.contains_key(&5));

        fs::write(dir.path().join("in_voltage5_raw"), "42").unwrap();
        assert_eq!(adc.read_sample(5).unwrap(), 42);
    }

    #[test]
    fn missing_device_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("iio:device9");
        assert!(matches!(
            IioAdc::open(missing),
            Err(CoreError::HardwareUnavailable(_))
        ));
    }
}
