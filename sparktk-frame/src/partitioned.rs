use std::any::Any;

use sparktk_core::deferred::{batch_apply, tree_reduce, Deferred};

/// Buckets every item of every partition by `key(position, item) % partitions`.  The result
/// holds, for each new partition, one deferred slice per old partition.
pub fn split_by_key<
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(usize, &A) -> usize,
>(
    defs: &[Deferred<Vec<A>>],
    partitions: usize,
    key: F,
) -> Vec<Vec<Deferred<Vec<A>>>> {
    let partitions = partitions.max(1);

    let stage1 = batch_apply(defs, move |_idx, vs| {
        let mut parts = vec![Vec::new(); partitions];
        for (idx, x) in vs.iter().enumerate() {
            parts[key(idx, x) % partitions].push(x.clone());
        }
        parts
    });

    // For each new partition, pull its bucket out of every old partition
    (0..partitions)
        .map(|p| {
            stage1
                .iter()
                .map(|s| s.apply(move |parts: &Vec<Vec<A>>| parts[p].clone()))
                .collect()
        })
        .collect()
}

/// Re-partitions into `partitions` new partitions, using `key` to choose the destination.
pub fn partition<
    A: Any + Send + Sync + Clone,
    F: 'static + Sync + Send + Clone + Fn(usize, &A) -> usize,
>(
    defs: &[Deferred<Vec<A>>],
    partitions: usize,
    key: F,
) -> Vec<Deferred<Vec<A>>> {
    split_by_key(defs, partitions, key)
        .iter()
        .filter_map(|group| concat(group))
        .collect()
}

/// Concatenates partitions in order.  None if there are none.
pub fn concat<A: Any + Send + Sync + Clone>(defs: &[Deferred<Vec<A>>]) -> Option<Deferred<Vec<A>>> {
    tree_reduce(defs, |x, y| {
        let mut out = Vec::with_capacity(x.len() + y.len());
        out.extend(x.iter().cloned());
        out.extend(y.iter().cloned());
        out
    })
}

#[cfg(test)]
mod test_partitioned {
    use super::*;
    use sparktk_core::scheduler::LeveledScheduler;

    #[test]
    fn test_partition_round_robin() {
        let defs = vec![Deferred::lift(vec![1, 2, 3, 4, 5usize], None)];
        let parts = partition(&defs, 2, |idx, _x| idx);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].run(&mut LeveledScheduler).unwrap(), vec![1, 3, 5]);
        assert_eq!(parts[1].run(&mut LeveledScheduler).unwrap(), vec![2, 4]);
    }

    #[test]
    fn test_concat_keeps_order() {
        let defs: Vec<_> = (0..5usize).map(|i| Deferred::lift(vec![i, i], None)).collect();
        let all = concat(&defs).unwrap().run(&mut LeveledScheduler).unwrap();
        assert_eq!(all, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4]);
        assert!(concat::<usize>(&[]).is_none());
    }
}
