use chrono::Utc;

/// Issues batch numbers for generated ids.
///
/// Numbers are wall-clock milliseconds, bumped past the previous value when
/// two batches land in the same millisecond or the clock steps back.
#[derive(Debug, Default)]
pub struct BatchClock {
    last: u64,
}

impl BatchClock {
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    pub fn next(&mut self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let batch = now.max(self.last + 1);
        self.last = batch;
        batch
    }
}
