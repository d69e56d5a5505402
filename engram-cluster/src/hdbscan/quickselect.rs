//! In-place quickselect for the k-th smallest element, O(n) average.

/// Return the k-th smallest value (1-indexed) of the slice, reordering
/// it in place. `k` is clamped to the slice length.
pub fn kth_smallest(values: &mut [f64], k: usize) -> f64 {
    assert!(!values.is_empty(), "kth_smallest on empty slice");
    let k = k.clamp(1, values.len()) - 1;
    let mut lo = 0;
    let mut hi = values.len() - 1;
    loop {
        if lo == hi {
            return values[lo];
        }
        let pivot = partition(values, lo, hi);
        match k.cmp(&pivot) {
            std::cmp::Ordering::Equal => return values[pivot],
            std::cmp::Ordering::Less => hi = pivot - 1,
            std::cmp::Ordering::Greater => lo = pivot + 1,
        }
    }
}

/// Hoare-style partition around a middle pivot; returns its final index.
fn partition(values: &mut [f64], lo: usize, hi: usize) -> usize {
    let mid = lo + (hi - lo) / 2;
    // Median-of-three pivot against sorted-input worst cases.
    if values[mid] < values[lo] {
        values.swap(mid, lo);
    }
    if values[hi] < values[lo] {
        values.swap(hi, lo);
    }
    if values[hi] < values[mid] {
        values.swap(hi, mid);
    }
    values.swap(mid, hi);
    let pivot = values[hi];

    let mut store = lo;
    for i in lo..hi {
        if values[i] < pivot {
            values.swap(i, store);
            store += 1;
        }
    }
    values.swap(store, hi);
    store
}
