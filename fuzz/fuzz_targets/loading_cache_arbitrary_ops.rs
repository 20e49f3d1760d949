#![no_main]

use libfuzzer_sys::fuzz_target;
use oncelru::LoadingCache;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// Fuzz arbitrary single-threaded operation sequences on LoadingCache
//
// Odd keys fail to load. Successful values always match the loader, failures
// never stay resident, and a resident key never reaches the loader again.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = LoadingCache::new(usize::from(data[0] % 8), move |key: &u8| {
        counter.fetch_add(1, Ordering::SeqCst);
        if key & 1 == 1 {
            Err(*key)
        } else {
            Ok(u32::from(*key) * 3)
        }
    });

    for pair in data[1..].chunks_exact(2) {
        let key = pair[1] % 24;
        match pair[0] % 5 {
            0 | 1 => {
                let resident = cache.peek(&key).is_some();
                let before = calls.load(Ordering::SeqCst);
                match cache.get(&key) {
                    Ok(value) => assert_eq!(*value, u32::from(key) * 3),
                    Err(err) => {
                        assert_eq!(err, key);
                        assert!(!cache.contains(&key));
                    }
                }
                let loaded = calls.load(Ordering::SeqCst) > before;
                assert_eq!(loaded, !resident);
            }
            2 => {
                cache.invalidate(&key);
                assert!(!cache.contains(&key));
            }
            3 => cache.set_capacity(usize::from(key % 8)),
            _ => cache.reset(),
        }
        assert!(cache.check_invariants().is_ok());
    }
});
