use std::sync::Arc;
use std::thread;

use strmap::ConcurrentMap;

fn main() {
    let map: Arc<ConcurrentMap<u64>> = Arc::new(ConcurrentMap::new());

    // 两个线程写同一组 key，合并函数做计数
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                for i in 0..1000 {
                    map.insert_or_update(format!("item{}", i % 10), 1, |_, n| n + 1);
                }
            })
        })
        .collect();
    for h in handles {
        let _ = h.join();
    }

    let mut keys = map.keys();
    keys.sort();
    for key in &keys {
        println!("{key}: {:?}", map.get(key));
    }

    map.delete("item0");
    println!("item0 after delete: {:?}", map.get("item0"));
    println!("entries: {}, empty: {}", map.len(), map.is_empty());
}
