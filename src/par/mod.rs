//! Interchangeable fork-join backends. Every backend produces identical results; they
//! only differ in how work is spread over threads.

use std::str::FromStr;

pub mod par_chili;
pub mod par_raw;
pub mod par_rayon;
pub mod par_sequential;

#[derive(PartialEq, Eq, Default, Clone, Copy, Debug, Hash)]
#[repr(u32)]
pub enum Scheduler {
    Sequential = 0,
    /// A rayon pool sized to the configured thread count.
    #[default]
    Rayon = 1,
    /// Scoped OS threads, one per chunk.
    Raw = 2,
    /// chili's heartbeat join.
    Chili = 3,
}

impl FromStr for Scheduler {
    type Err = String;

    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seq" => Ok(Self::Sequential),
            "rayon" => Ok(Self::Rayon),
            "raw" => Ok(Self::Raw),
            "chili" => Ok(Self::Chili),
            _ => Err(format!(
                "Unknown mode: '{s}', valid modes: 'seq', 'rayon', 'raw', 'chili'"
            )),
        }
    }
}

impl Scheduler {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Scheduler::Sequential),
            1 => Some(Scheduler::Rayon),
            2 => Some(Scheduler::Raw),
            3 => Some(Scheduler::Chili),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scheduler::Sequential => "seq",
            Scheduler::Rayon => "rayon",
            Scheduler::Raw => "raw",
            Scheduler::Chili => "chili",
        }
    }

    /// Calls `func(index, item)` for every item, spread over up to `chunks` threads.
    #[inline(always)]
    pub fn par_map<T, F>(self, data: &mut [T], func: &F, chunks: usize)
    where
        T: Send + Sync,
        F: Fn(usize, &mut T) + Send + Sync,
    {
        if data.len() <= 1 || chunks <= 1 {
            return par_sequential::par_map(data, func);
        }
        match self {
            Scheduler::Sequential => par_sequential::par_map(data, func),
            Scheduler::Rayon => par_rayon::par_map(data, func, chunks),
            Scheduler::Raw => par_raw::par_map(data, func, chunks),
            Scheduler::Chili => par_chili::par_map(data, func, chunks),
        }
    }
}

impl std::fmt::Display for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Scheduler; 4] = [
        Scheduler::Sequential,
        Scheduler::Rayon,
        Scheduler::Raw,
        Scheduler::Chili,
    ];

    #[test]
    fn names_round_trip() {
        for scheduler in ALL {
            assert_eq!(scheduler.name().parse::<Scheduler>(), Ok(scheduler));
            assert_eq!(Scheduler::from_u32(scheduler as u32), Some(scheduler));
        }
        assert!("forte".parse::<Scheduler>().is_err());
        assert_eq!(Scheduler::from_u32(9), None);
    }

    #[test]
    fn par_map_visits_every_index_once() {
        for scheduler in ALL {
            for len in [0, 1, 2, 7, 64, 1000] {
                for chunks in [1, 2, 3, 8] {
                    let mut data = vec![usize::MAX; len];
                    scheduler.par_map(&mut data, &|i, item| *item = i * 2, chunks);
                    let expected: Vec<usize> = (0..len).map(|i| i * 2).collect();
                    assert_eq!(data, expected, "{scheduler:?} len {len} chunks {chunks}");
                }
            }
        }
    }
}
