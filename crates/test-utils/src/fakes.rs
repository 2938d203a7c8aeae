use std::collections::VecDeque;

use cloudy::errors::Result;
use cloudy::export::RecordSink;
use cloudy::injector::InterruptionSource;
use cloudy::report::InstanceRecord;
use cloudy::types::InstanceId;

/// An interruption source that:
/// - interrupts exactly the ids scripted for each successive tick
///   (filtered to those actually running)
/// - records which instances were running on every call.
#[derive(Debug, Default)]
pub struct ScriptedInterruptions {
    script: VecDeque<Vec<InstanceId>>,
    pub offered: Vec<Vec<InstanceId>>,
}

impl ScriptedInterruptions {
    /// Never interrupts anything.
    pub fn none() -> Self {
        Self::default()
    }

    /// Append the selection for the next unscripted tick.
    pub fn then(mut self, ids: impl IntoIterator<Item = usize>) -> Self {
        self.script
            .push_back(ids.into_iter().map(InstanceId).collect());
        self
    }
}

impl InterruptionSource for ScriptedInterruptions {
    fn select(&mut self, running: &[InstanceId]) -> Vec<InstanceId> {
        self.offered.push(running.to_vec());
        let wanted = self.script.pop_front().unwrap_or_default();
        wanted.into_iter().filter(|id| running.contains(id)).collect()
    }
}

/// A record sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<InstanceRecord>,
    pub finished: bool,
}

impl RecordSink for MemorySink {
    fn write_record(&mut self, record: &InstanceRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
