//! Weight computation strategies.
//!
//! Selected once per report run and never switched afterwards. The event
//! count strategy is stateless. The time-delta strategy implements off-cpu
//! accounting: a record's weight is the wall-clock gap until the next
//! record of the same thread, so each record is held pending until its
//! successor arrives.

use crate::record::schema::SampleRecord;
use std::collections::HashMap;
use std::rc::Rc;

/// Weight policy for direct samples
#[derive(Debug)]
pub enum WeightStrategy {
    /// Weight is the record's own period field
    EventCount,
    /// Off-cpu mode: weight is the time gap to the next same-thread record
    TimeDelta {
        /// At most one pending record per thread id
        pending: HashMap<u32, Rc<SampleRecord>>,
    },
}

impl WeightStrategy {
    pub fn new(trace_offcpu: bool) -> Self {
        if trace_offcpu {
            Self::TimeDelta {
                pending: HashMap::new(),
            }
        } else {
            Self::EventCount
        }
    }

    /// Admit one raw record, returning the record to aggregate now and its
    /// weight, or `None` when emission is deferred.
    ///
    /// In time-delta mode the incoming record replaces the thread's pending
    /// slot and the previous occupant is emitted with weight
    /// `max(1, incoming.time - pending.time)`; the clamp guards against
    /// out-of-order timestamps. The last record of each thread stays
    /// pending forever and is never emitted, matching the recorded
    /// behavior of off-cpu accounting.
    pub fn admit(&mut self, record: &Rc<SampleRecord>) -> Option<(Rc<SampleRecord>, u64)> {
        match self {
            Self::EventCount => Some((record.clone(), record.period)),
            Self::TimeDelta { pending } => {
                let previous = pending.insert(record.tid, record.clone())?;
                let weight = record.time.saturating_sub(previous.time).max(1);
                Some((previous, weight))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tid: u32, time: u64, period: u64) -> Rc<SampleRecord> {
        Rc::new(SampleRecord {
            attr_id: 0,
            time,
            period,
            cpu: 0,
            pid: tid,
            tid,
            ip: 0x1000,
            in_kernel: false,
            callchain: vec![],
            branch_stack: vec![],
        })
    }

    #[test]
    fn test_event_count_is_immediate() {
        let mut strategy = WeightStrategy::new(false);
        let r = record(1, 100, 42);
        let (emitted, weight) = strategy.admit(&r).unwrap();
        assert_eq!(weight, 42);
        assert_eq!(emitted.time, 100);
    }

    #[test]
    fn test_time_delta_pairs_consecutive_records() {
        let mut strategy = WeightStrategy::new(true);
        assert!(strategy.admit(&record(1, 100, 0)).is_none());

        let (emitted, weight) = strategy.admit(&record(1, 140, 0)).unwrap();
        assert_eq!(emitted.time, 100);
        assert_eq!(weight, 40);

        // The third record pairs with the second; the third itself stays
        // pending with no successor.
        let (emitted, weight) = strategy.admit(&record(1, 300, 0)).unwrap();
        assert_eq!(emitted.time, 140);
        assert_eq!(weight, 160);
    }

    #[test]
    fn test_time_delta_threads_are_independent() {
        let mut strategy = WeightStrategy::new(true);
        assert!(strategy.admit(&record(1, 100, 0)).is_none());
        assert!(strategy.admit(&record(2, 110, 0)).is_none());
        let (emitted, weight) = strategy.admit(&record(1, 150, 0)).unwrap();
        assert_eq!(emitted.tid, 1);
        assert_eq!(weight, 50);
    }

    #[test]
    fn test_time_delta_clamps_out_of_order() {
        let mut strategy = WeightStrategy::new(true);
        assert!(strategy.admit(&record(1, 200, 0)).is_none());
        let (_, weight) = strategy.admit(&record(1, 150, 0)).unwrap();
        assert_eq!(weight, 1);
    }
}
