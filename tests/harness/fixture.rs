// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use assert_fs::prelude::*;
use async_trait::async_trait;
use tokio::sync::Mutex;

use acm_dfu_test::cable::CableType;
use acm_dfu_test::error::HarnessError;
use acm_dfu_test::harness::PreparedRun;
use acm_dfu_test::output::{Config, TimestampProvider};
use acm_dfu_test::package::FirmwareComponent;
use acm_dfu_test::settings::Settings;
use acm_dfu_test::tool::{ProcessExecutionError, ToolCommand, ToolInvoker, ToolOutput};
use acm_dfu_test::trial::RunSummary;

pub const DATETIME: chrono::DateTime<chrono::offset::Utc> =
    chrono::DateTime::from_timestamp_nanos(0);
pub const DATETIME_FORMATTED: &str = "1970-01-01T00:00:00.000Z";
pub struct FixedTsProvider {}

impl TimestampProvider for FixedTsProvider {
    fn now(&self) -> chrono::DateTime<chrono_tz::Tz> {
        DATETIME.with_timezone(&chrono_tz::UTC)
    }
}

/// What the stub enumerator reports as iSerial.
#[derive(Clone)]
pub enum SerialReport {
    /// The serial number most recently passed to the image builder.
    Echo,
    Fixed(String),
}

/// What the stub image builder leaves at its `-o` path.
#[derive(Clone, Copy, PartialEq)]
pub enum BuilderOutput {
    Package,
    Directory,
    Nothing,
}

/// Stands in for the image builder, the flasher and lsusb.
pub struct StubInvoker {
    pub serial_report: SerialReport,
    pub flasher_exit: Option<i32>,
    pub builder_output: BuilderOutput,

    calls: StdMutex<Vec<ToolCommand>>,
    last_build: StdMutex<Option<(String, String)>>,
}

impl StubInvoker {
    pub fn new() -> Self {
        StubInvoker {
            serial_report: SerialReport::Echo,
            flasher_exit: None,
            builder_output: BuilderOutput::Package,
            calls: StdMutex::new(vec![]),
            last_build: StdMutex::new(None),
        }
    }

    pub fn reporting_serial(mut self, serial: &str) -> Self {
        self.serial_report = SerialReport::Fixed(serial.to_owned());
        self
    }

    pub fn failing_flasher(mut self, code: i32) -> Self {
        self.flasher_exit = Some(code);
        self
    }

    pub fn without_artifact(mut self) -> Self {
        self.builder_output = BuilderOutput::Nothing;
        self
    }

    pub fn with_directory_artifact(mut self) -> Self {
        self.builder_output = BuilderOutput::Directory;
        self
    }

    pub fn calls_to(&self, program: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|c| c.program() == program)
            .count()
    }

    fn build(&self, command: &ToolCommand) -> Result<ToolOutput, ProcessExecutionError> {
        let serial = command.arg_after("-s").unwrap_or_default().to_owned();
        let cable = command.arg_after("-a").unwrap_or_default().to_owned();
        *self.last_build.lock().expect("build lock") = Some((serial, cable));

        let dir = command.get_current_dir().unwrap_or(Path::new("."));
        let output = dir.join(command.arg_after("-o").unwrap_or("missing.dfu"));
        let written = match self.builder_output {
            BuilderOutput::Package => std::fs::write(&output, b"DFU\x00"),
            BuilderOutput::Directory => std::fs::create_dir_all(&output),
            BuilderOutput::Nothing => Ok(()),
        };
        written.map_err(|source| ProcessExecutionError::Spawn {
            command: command.to_string(),
            source,
        })?;

        Ok(ToolOutput {
            stdout: "package built".to_owned(),
            stderr: String::new(),
        })
    }

    fn flash(&self, command: &ToolCommand) -> Result<ToolOutput, ProcessExecutionError> {
        match self.flasher_exit {
            Some(code) => Err(ProcessExecutionError::Failed {
                command: command.to_string(),
                code,
                output: "dfu-util: No DFU capable USB device available".to_owned(),
            }),
            None => Ok(ToolOutput {
                stdout: "Download done.".to_owned(),
                stderr: String::new(),
            }),
        }
    }

    fn enumerate(&self) -> Result<ToolOutput, ProcessExecutionError> {
        let (flashed, cable) = self
            .last_build
            .lock()
            .expect("build lock")
            .clone()
            .unwrap_or_default();
        let serial = match &self.serial_report {
            SerialReport::Echo => flashed,
            SerialReport::Fixed(serial) => serial.clone(),
        };

        Ok(ToolOutput {
            stdout: lsusb_report("GE Healthcare", &cable.to_uppercase(), &serial),
            stderr: String::new(),
        })
    }
}

#[async_trait]
impl ToolInvoker for StubInvoker {
    async fn invoke(&self, command: &ToolCommand) -> Result<ToolOutput, ProcessExecutionError> {
        self.calls.lock().expect("calls lock").push(command.clone());

        match command.program() {
            "perl" => self.build(command),
            "dfu-util" => self.flash(command),
            "lsusb" => self.enumerate(),
            _ => Err(ProcessExecutionError::Spawn {
                command: command.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

pub fn lsusb_report(manufacturer: &str, product: &str, serial: &str) -> String {
    format!(
        "Bus 001 Device 007: ID 1901:0020\n\
         Device Descriptor:\n  \
           bLength                18\n  \
           idVendor           0x1901\n  \
           idProduct          0x0020\n  \
           iManufacturer           1 {manufacturer}\n  \
           iProduct                2 {product}\n  \
           iSerial                 3 {serial}\n  \
           bNumConfigurations      1\n"
    )
}

/// A DFU directory with one image per component.
pub fn image_tree() -> Result<assert_fs::TempDir> {
    let tmp = assert_fs::TempDir::new()?;
    for component in FirmwareComponent::ALL {
        tmp.child(component.name())
            .child(format!("{}_v1.bin", component.name().to_lowercase()))
            .write_binary(b"\x7fIMG")?;
    }
    Ok(tmp)
}

pub fn bench_settings(work_directory: &Path, trials: u32) -> Settings {
    Settings {
        trials,
        enumeration_delay_secs: 0,
        work_directory: work_directory.to_owned(),
        ..Default::default()
    }
}

/// Firmware packages left in `dir`.
pub fn packages_in(dir: &Path) -> Result<Vec<String>> {
    let mut names = vec![];
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with("sn_") {
            names.push(name);
        }
    }
    Ok(names)
}

pub struct RunOutcome {
    pub summary: Result<RunSummary, HarnessError>,
    pub records: Vec<serde_json::Value>,
}

pub async fn execute_run(
    invoker: &StubInvoker,
    cable_type: &str,
    dfu_directory: &Path,
    settings: Settings,
) -> Result<RunOutcome> {
    let buffer: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
    let config = Config::builder()
        .with_buffer_output(Arc::clone(&buffer))
        .with_timestamp_provider(Box::new(FixedTsProvider {}))
        .build();

    let cable = cable_type.parse::<CableType>()?;
    let prepared = PreparedRun::new(cable, dfu_directory, settings)?;
    let summary = prepared.execute(invoker, config).await;

    let mut records = vec![];
    for entry in buffer.lock().await.iter() {
        records.push(serde_json::from_str::<serde_json::Value>(entry)?);
    }

    Ok(RunOutcome { summary, records })
}

/// `schemaVersion`, `run.<artifact>` or `trial.<artifact>` for a record.
pub fn record_kind(record: &serde_json::Value) -> String {
    if record.get("schemaVersion").is_some() {
        return "schemaVersion".to_owned();
    }
    if let Some(serde_json::Value::Object(run)) = record.get("runArtifact") {
        if let Some(key) = run.keys().next() {
            return format!("run.{key}");
        }
    }
    if let Some(serde_json::Value::Object(trial)) = record.get("trialArtifact") {
        if let Some(key) = trial.keys().find(|k| *k != "trialId") {
            return format!("trial.{key}");
        }
    }
    "unknown".to_owned()
}
