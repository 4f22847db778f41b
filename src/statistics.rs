use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

/// The type of information passed in the statistics channel
#[derive(Debug, Clone, Copy)]
pub enum Stats {
    ReceivedBytes(usize),
    ReceivedPkts(usize),
    DroppedPkts(usize),
    ErrorPkts(usize),
}

pub trait Number {
    fn add(&self, value: usize);
    fn get(&self) -> usize;
}

#[derive(Default)]
pub struct Count(AtomicUsize);

impl Number for Count {
    fn add(&self, value: usize) {
        self.0.fetch_add(value, Ordering::Relaxed);
    }

    fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

/// Receiver traffic statistics
pub struct Counts<T> {
    pub received_bytes: T,
    pub received_pkts: T,
    pub dropped_pkts: T,
    pub error_pkts: T,
}

impl<T: Number> Counts<T> {
    /// # Example
    ///
    /// ```
    /// use showbridge::statistics::*;
    ///
    /// let counts = Counts {
    ///     received_bytes: Count::default(),
    ///     received_pkts: Count::default(),
    ///     dropped_pkts: Count::default(),
    ///     error_pkts: Count::default(),
    /// };
    ///
    /// counts.add(&Stats::ReceivedBytes(100));
    /// assert_eq!(counts.received_bytes.get(), 100);
    ///
    /// counts.add(&Stats::ReceivedPkts(1));
    /// assert_eq!(counts.received_pkts.get(), 1);
    ///
    /// counts.add(&Stats::DroppedPkts(1));
    /// assert_eq!(counts.dropped_pkts.get(), 1);
    /// ```
    pub fn add(&self, payload: &Stats) {
        match payload {
            Stats::ReceivedBytes(v) => self.received_bytes.add(*v),
            Stats::ReceivedPkts(v) => self.received_pkts.add(*v),
            Stats::DroppedPkts(v) => self.dropped_pkts.add(*v),
            Stats::ErrorPkts(v) => self.error_pkts.add(*v),
        }
    }
}

impl Default for Counts<Count> {
    fn default() -> Self {
        Self {
            received_bytes: Count::default(),
            received_pkts: Count::default(),
            dropped_pkts: Count::default(),
            error_pkts: Count::default(),
        }
    }
}

/// Shared traffic statistics, updated by the receiver worker and readable
/// from any thread.
#[derive(Default, Clone)]
pub struct Statistics(Arc<Counts<Count>>);

impl Statistics {
    pub fn add(&self, payload: Stats) {
        self.0.add(&payload);
    }

    /// Obtain a point-in-time copy of the counters.
    ///
    /// # Example
    ///
    /// ```
    /// use showbridge::statistics::*;
    ///
    /// let statistics = Statistics::default();
    ///
    /// statistics.add(Stats::ReceivedPkts(2));
    /// assert_eq!(statistics.get().received_pkts, 2);
    /// assert_eq!(statistics.get().error_pkts, 0);
    /// ```
    pub fn get(&self) -> Counts<usize> {
        Counts {
            received_bytes: self.0.received_bytes.get(),
            received_pkts: self.0.received_pkts.get(),
            dropped_pkts: self.0.dropped_pkts.get(),
            error_pkts: self.0.error_pkts.get(),
        }
    }
}
