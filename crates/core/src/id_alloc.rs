//! Monotonic id generator

use hwmgr_types::{HwError, HwResult};

/// Hands out strictly increasing ids starting at 1
///
/// Ids are never reused, even after the entity they named is gone. 0 is
/// reserved as the "all" sentinel and is never produced.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// The id the next call to [`allocate`](Self::allocate) will return
    pub fn peek(&self) -> HwResult<u32> {
        if self.next == 0 {
            Err(HwError::Overrun("id space exhausted".to_string()))
        } else {
            Ok(self.next)
        }
    }

    pub fn allocate(&mut self) -> HwResult<u32> {
        let id = self.peek()?;
        // Wraps to the 0 sentinel once u32::MAX has been handed out
        self.next = id.wrapping_add(1);
        Ok(id)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate().unwrap(), 1);
        assert_eq!(ids.allocate().unwrap(), 2);
        assert_eq!(ids.peek().unwrap(), 3);
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut ids = IdAllocator { next: u32::MAX };
        assert_eq!(ids.allocate().unwrap(), u32::MAX);
        assert!(matches!(ids.allocate(), Err(HwError::Overrun(_))));
    }
}
