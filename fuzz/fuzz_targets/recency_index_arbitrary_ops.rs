#![no_main]

use libfuzzer_sys::fuzz_target;
use oncelru::ds::RecencyIndex;

// Fuzz arbitrary operation sequences on RecencyIndex
//
// Mixes touch/insert, remove, generation-checked remove, resize and clear,
// checking the index/list bijection and capacity after every step.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let mut index: RecencyIndex<u8, u64> = RecencyIndex::new(usize::from(data[0] % 16));
    let mut last_generation = None;

    for pair in data[1..].chunks_exact(2) {
        let op = pair[0] % 6;
        let key = pair[1] % 32;

        match op {
            0 | 1 => {
                let touch = index.touch_or_insert_with(&key, |generation| generation);
                assert_eq!(touch.value, touch.generation);
                assert!(index.contains(&key));
                if touch.inserted {
                    if let Some(previous) = last_generation {
                        assert!(touch.generation > previous);
                    }
                    last_generation = Some(touch.generation);
                } else {
                    assert_eq!(touch.evicted, 0);
                }
                assert_eq!(index.keys().next(), Some(&key));
            }
            2 => {
                let existed = index.contains(&key);
                assert_eq!(index.remove(&key).is_some(), existed);
                assert!(!index.contains(&key));
            }
            3 => {
                if let Some(generation) = index.generation(&key) {
                    assert!(index.remove_generation(&key, generation + 1).is_none());
                    assert!(index.remove_generation(&key, generation).is_some());
                }
            }
            4 => {
                let capacity = usize::from(key % 16);
                index.set_capacity(capacity);
                assert!(index.len() <= capacity);
            }
            _ => {
                index.clear();
                assert!(index.is_empty());
            }
        }

        assert!(index.check_invariants().is_ok());
    }
});
