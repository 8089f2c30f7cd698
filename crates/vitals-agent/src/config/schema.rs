use std::time::Duration;

use serde::Deserialize;
use vitals_core::error::{Result, VitalsError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub version: u32,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub collectors: CollectorsSection,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            version: 1,
            agent: AgentSection::default(),
            output: OutputSection::default(),
            collectors: CollectorsSection::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(VitalsError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.agent.validate()?;
        self.output.validate()?;
        self.collectors.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_jiffy_ms")]
    pub jiffy_ms: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            namespace: default_namespace(),
            jiffy_ms: default_jiffy_ms(),
        }
    }
}

impl AgentSection {
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(VitalsError::BadConfig("agent.namespace must not be empty".into()));
        }
        if !(10..=1000).contains(&self.jiffy_ms) {
            return Err(VitalsError::BadConfig(
                "agent.jiffy_ms must be between 10 and 1000".into(),
            ));
        }
        Ok(())
    }

    pub fn jiffy(&self) -> Duration {
        Duration::from_millis(self.jiffy_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default = "default_true")]
    pub hide_nan_gauges: bool,

    /// 0 disables the periodic text dump.
    #[serde(default)]
    pub text_dump_interval_ms: u64,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            hide_nan_gauges: true,
            text_dump_interval_ms: 0,
        }
    }
}

impl OutputSection {
    pub fn validate(&self) -> Result<()> {
        let ms = self.text_dump_interval_ms;
        if ms != 0 && !(1000..=3_600_000).contains(&ms) {
            return Err(VitalsError::BadConfig(
                "output.text_dump_interval_ms must be 0 or between 1000 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn text_dump_interval(&self) -> Option<Duration> {
        (self.text_dump_interval_ms > 0).then(|| Duration::from_millis(self.text_dump_interval_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorToggle {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Overrides `collectors.interval_ms`.
    #[serde(default)]
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorsSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "enabled")]
    pub cpu: CollectorToggle,
    #[serde(default = "enabled")]
    pub memory: CollectorToggle,
    #[serde(default = "enabled")]
    pub disk: CollectorToggle,
    #[serde(default = "enabled")]
    pub network: CollectorToggle,
    #[serde(default = "enabled")]
    pub load: CollectorToggle,
    #[serde(default = "enabled")]
    pub process: CollectorToggle,
}

impl Default for CollectorsSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            cpu: enabled(),
            memory: enabled(),
            disk: enabled(),
            network: enabled(),
            load: enabled(),
            process: enabled(),
        }
    }
}

impl CollectorsSection {
    pub fn validate(&self) -> Result<()> {
        check_interval("collectors.interval_ms", self.interval_ms)?;
        for (name, toggle) in self.toggles() {
            if let Some(ms) = toggle.interval_ms {
                check_interval(&format!("collectors.{name}.interval_ms"), ms)?;
            }
        }
        Ok(())
    }

    /// `(name, toggle)` for every known collector.
    pub fn toggles(&self) -> [(&'static str, &CollectorToggle); 6] {
        [
            ("cpu", &self.cpu),
            ("memory", &self.memory),
            ("disk", &self.disk),
            ("network", &self.network),
            ("load", &self.load),
            ("process", &self.process),
        ]
    }

    /// Effective poll interval for one collector.
    pub fn interval_for(&self, toggle: &CollectorToggle) -> Duration {
        Duration::from_millis(toggle.interval_ms.unwrap_or(self.interval_ms))
    }
}

fn check_interval(field: &str, ms: u64) -> Result<()> {
    if !(100..=3_600_000).contains(&ms) {
        return Err(VitalsError::BadConfig(format!(
            "{field} must be between 100 and 3600000"
        )));
    }
    Ok(())
}

fn default_listen() -> String {
    "127.0.0.1:12345".into()
}
fn default_namespace() -> String {
    "vitals".into()
}
fn default_jiffy_ms() -> u64 {
    100
}
fn default_interval_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn enabled() -> CollectorToggle {
    CollectorToggle {
        enabled: true,
        interval_ms: None,
    }
}
