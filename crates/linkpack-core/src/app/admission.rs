//! AdmissionGate - 同時に受け付けるタスク数の上限
//!
//! カウンタを直接増減する代わりに、`try_acquire()` が返す `AdmissionPermit`
//! の生存期間で 1 タスク分の枠を表す。permit は Drop で必ず返却されるので、
//! 処理ジョブのどの終了経路（成功・失敗・panic）でも増減が釣り合う。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct AdmissionGate {
    in_flight: Arc<AtomicUsize>,
    limit: usize,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            limit,
        }
    }

    /// 枠が空いていれば permit を返す。上限に達していれば None。
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.limit).then_some(current + 1)
            })
            .ok()
            .map(|_| AdmissionPermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// One admitted task. Dropping it releases the slot.
#[derive(Debug)]
#[must_use = "dropping the permit releases the admission slot immediately"]
pub struct AdmissionPermit {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquires_up_to_limit() {
        let gate = AdmissionGate::new(2);

        let first = gate.try_acquire();
        let second = gate.try_acquire();
        let third = gate.try_acquire();

        assert!(first.is_some());
        assert!(second.is_some());
        assert!(third.is_none());
        assert_eq!(gate.in_flight(), 2);
    }

    #[test]
    fn drop_releases_slot() {
        let gate = AdmissionGate::new(1);

        let permit = gate.try_acquire().unwrap();
        assert!(gate.try_acquire().is_none());

        drop(permit);
        assert_eq!(gate.in_flight(), 0);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn zero_limit_admits_nothing() {
        let gate = AdmissionGate::new(0);
        assert!(gate.try_acquire().is_none());
    }

    #[tokio::test]
    async fn concurrent_acquire_never_exceeds_limit() {
        let gate = Arc::new(AdmissionGate::new(3));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move { gate.try_acquire() }));
        }

        let mut held = Vec::new();
        for handle in handles {
            if let Some(permit) = handle.await.unwrap() {
                held.push(permit);
            }
        }

        assert_eq!(held.len(), 3);
        assert_eq!(gate.in_flight(), 3);
        held.clear();
        assert_eq!(gate.in_flight(), 0);
    }
}
