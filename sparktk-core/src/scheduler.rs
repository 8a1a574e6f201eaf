use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::Level::{Debug as LDebug, Trace};
use priority_queue::PriorityQueue;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::EngineError;
use crate::graph::{Graph, Handle, Inputs, Node};
use crate::task::{Args, Fault, Payload};

type DepGraph = HashMap<Arc<Handle>, HashSet<Arc<Handle>>>;
type Chain = Vec<Arc<Handle>>;
type ChainGraph = HashMap<Chain, HashSet<Arc<Handle>>>;
type Store = DataStore<Arc<Handle>, Arc<Payload>>;

/// Holds computed values until their last consumer has read them.
#[derive(Debug)]
struct DataStore<K: Hash + Eq, V> {
    data: HashMap<K, V>,
    counts: HashMap<K, usize>,
}

impl<K: Hash + Eq, V: Clone> DataStore<K, V> {
    fn new(counts: HashMap<K, usize>) -> Self {
        DataStore {
            data: HashMap::new(),
            counts,
        }
    }

    fn get(&mut self, handle: &K) -> Option<V> {
        let remaining = self
            .counts
            .get_mut(handle)
            .map(|c| {
                *c = c.saturating_sub(1);
                *c
            })
            .unwrap_or(0);

        if remaining == 0 {
            self.data.remove(handle)
        } else {
            self.data.get(handle).cloned()
        }
    }

    fn insert(&mut self, handle: K, data: V) {
        self.data.insert(handle, data);
    }
}

/// Executes a task graph, blocking until the requested outputs are available or a stage fails.
pub trait Scheduler {
    /// Computes `outputs` from `graph`.
    fn compute(
        &mut self,
        graph: Arc<Graph>,
        outputs: &[Arc<Handle>],
    ) -> Result<Vec<Arc<Payload>>, EngineError>;
}

enum Limbo {
    One(Arc<Payload>),
    Two(Arc<Payload>, Arc<Payload>),
}

fn lock(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

fn take(ds: &mut Store, h: &Arc<Handle>) -> Result<Arc<Payload>, EngineError> {
    ds.get(h).ok_or_else(|| EngineError::MissingOutput(h.to_string()))
}

fn fetch_inputs(ds: &mut Store, inputs: &Inputs) -> Result<Limbo, EngineError> {
    match inputs {
        Inputs::Single(h) => Ok(Limbo::One(take(ds, h)?)),
        Inputs::Pair(l, r) => {
            let left = take(ds, l)?;
            Ok(Limbo::Two(left, take(ds, r)?))
        }
    }
}

// Converts a flattened graph into inbound and outbound dependency lists
fn build_dep_graph(graph: &Graph) -> (DepGraph, DepGraph) {
    let mut inbound: DepGraph = HashMap::new();
    let mut outbound: DepGraph = HashMap::new();
    for (output, inputs) in graph.inputs.iter() {
        let deps: HashSet<_> = inputs.iter().flat_map(|i| i.handles()).collect();
        for h in deps.iter() {
            outbound
                .entry(h.clone())
                .or_default()
                .insert(output.clone());
        }
        inbound.insert(output.clone(), deps);
    }
    (inbound, outbound)
}

// How many times each value will be read: once per consuming chain argument, plus once
// for every requested output.
fn consumer_counts(
    graph: &Graph,
    chains: &ChainGraph,
    outputs: &[Arc<Handle>],
) -> HashMap<Arc<Handle>, usize> {
    let mut counts = HashMap::new();
    for chain in chains.keys() {
        if let Some(Some(inputs)) = graph.inputs.get(&chain[0]) {
            for h in inputs.handles() {
                *counts.entry(h).or_insert(0usize) += 1;
            }
        }
    }
    for h in outputs {
        *counts.entry(h.clone()).or_insert(0usize) += 1;
    }
    counts
}

// Finds chains of tasks that can be collapsed into a single task.  A node extends a chain
// when it is the only consumer of the chain tail and the tail is its only input.  Nodes in
// `stops` always end a chain, so their values stay addressable.
fn collapse_graph<K: Hash + Eq + Clone>(
    mut nodes: HashMap<K, HashSet<K>>,
    stops: &HashSet<K>,
) -> HashMap<Vec<K>, HashSet<K>> {
    let mut outbound: HashMap<K, Vec<K>> = HashMap::new();
    let mut n_inbound: HashMap<K, usize> = HashMap::new();
    let mut roots = Vec::new();
    for (node, deps) in nodes.iter() {
        outbound.entry(node.clone()).or_default();
        for d in deps.iter() {
            outbound.entry(d.clone()).or_default().push(node.clone());
        }
        if deps.is_empty() {
            roots.push(vec![node.clone()]);
        }
        n_inbound.insert(node.clone(), deps.len());
    }

    let mut chains = HashMap::new();
    let mut seen = HashSet::new();
    while let Some(mut chain) = roots.pop() {
        let tail = chain[chain.len() - 1].clone();
        let consumers: &[K] = outbound.get(&tail).map(|v| v.as_slice()).unwrap_or(&[]);

        let link = match consumers {
            [only] if !stops.contains(&tail) && n_inbound.get(only) == Some(&1) => Some(only.clone()),
            _ => None,
        };

        match link {
            Some(node) => {
                chain.push(node);
                roots.push(chain);
            }
            None => {
                for node in consumers.iter() {
                    if seen.insert(node.clone()) {
                        roots.push(vec![node.clone()]);
                    }
                }
                if let Some(deps) = nodes.remove(&chain[0]) {
                    chains.insert(chain, deps);
                }
            }
        }
    }

    chains
}

// Groups chains into levels; chains within a level have no dependencies between them
fn generate_levels(collapsed: &ChainGraph) -> Vec<Vec<Chain>> {
    let mut outbound: HashMap<&Arc<Handle>, Vec<&Chain>> = HashMap::new();
    for (chain, deps) in collapsed.iter() {
        for d in deps.iter() {
            outbound.entry(d).or_default().push(chain);
        }
    }

    let mut inbound: HashMap<&Chain, HashSet<&Arc<Handle>>> = collapsed
        .iter()
        .map(|(chain, deps)| (chain, deps.iter().collect()))
        .collect();

    let mut levels = Vec::new();
    let mut cur_level: Vec<&Chain> = inbound
        .iter()
        .filter(|(_, deps)| deps.is_empty())
        .map(|(chain, _)| *chain)
        .collect();

    while !cur_level.is_empty() {
        for chain in cur_level.iter() {
            inbound.remove(*chain);
        }

        let mut next_level = Vec::new();
        for chain in cur_level.iter() {
            let last = &chain[chain.len() - 1];
            for node in outbound.get(last).into_iter().flatten() {
                if let Some(deps) = inbound.get_mut(*node) {
                    deps.remove(last);
                    if deps.is_empty() {
                        next_level.push(*node);
                    }
                }
            }
        }

        levels.push(cur_level.into_iter().cloned().collect::<Vec<_>>());
        cur_level = next_level;
    }

    if log_enabled!(LDebug) {
        let mut max_con = 0usize;
        for (i, l) in levels.iter().enumerate() {
            max_con = max_con.max(l.len());
            debug!("Level: {}, Chains: {}", i, l.len());
        }
        debug!("Max Concurrency: {}", max_con);
    }
    levels
}

fn run_chain(graph: &Graph, chain: &[Arc<Handle>], store: &Mutex<Store>) -> Result<(), EngineError> {
    let head = &chain[0];
    trace!("Reading dependencies for chain {}", head);
    let mut args = match graph.inputs.get(head) {
        Some(Some(inputs)) => Some(fetch_inputs(&mut lock(store), inputs)?),
        _ => None,
    };

    for handle in chain {
        trace!("Processing handle: {}", handle);
        let node = graph
            .nodes
            .get(handle)
            .ok_or_else(|| EngineError::MissingOutput(handle.to_string()))?;

        let out = match node.as_ref() {
            Node::Source(source) => source.read(),
            Node::Stage(stage) => {
                // A self-join inside a chain receives the previous output on both sides
                if matches!(graph.inputs.get(handle), Some(Some(Inputs::Pair(..)))) {
                    args = match args.take() {
                        Some(Limbo::One(a)) => Some(Limbo::Two(a.clone(), a)),
                        other => other,
                    };
                }
                let result = match &args {
                    Some(Limbo::One(a)) => stage.eval(Args::One(a.as_ref())),
                    Some(Limbo::Two(a, b)) => stage.eval(Args::Two(a.as_ref(), b.as_ref())),
                    None => return Err(EngineError::MissingOutput(handle.to_string())),
                };
                result.map_err(|fault| match fault {
                    Fault::Mismatch => EngineError::TypeMismatch {
                        stage: handle.to_string(),
                    },
                    Fault::Failed(source) => EngineError::StageFailed {
                        stage: handle.to_string(),
                        source,
                    },
                })?
            }
        };
        args = Some(Limbo::One(Arc::new(out)));
    }

    if let Some(Limbo::One(d)) = args {
        lock(store).insert(chain[chain.len() - 1].clone(), d);
    }
    Ok(())
}

fn collect_outputs(
    store: &Mutex<Store>,
    outputs: &[Arc<Handle>],
) -> Result<Vec<Arc<Payload>>, EngineError> {
    let mut ds = lock(store);
    outputs.iter().map(|h| take(&mut ds, h)).collect()
}

fn plan(graph: &Graph, outputs: &[Arc<Handle>]) -> (ChainGraph, DepGraph) {
    debug!("Number of Tasks Specified: {}", graph.len());
    let (inbound, outbound) = build_dep_graph(graph);
    let stops: HashSet<_> = outputs.iter().cloned().collect();
    let collapsed = collapse_graph(inbound, &stops);
    debug!("Number of Chains to Run: {}", collapsed.len());
    (collapsed, outbound)
}

/// Runs the graph level by level, executing each level in parallel on the rayon global pool.
pub struct LeveledScheduler;

impl Scheduler for LeveledScheduler {
    fn compute(
        &mut self,
        graph: Arc<Graph>,
        outputs: &[Arc<Handle>],
    ) -> Result<Vec<Arc<Payload>>, EngineError> {
        let (collapsed, _outbound) = plan(&graph, outputs);
        let store = Mutex::new(DataStore::new(consumer_counts(&graph, &collapsed, outputs)));

        for (i, level) in generate_levels(&collapsed).into_iter().enumerate() {
            debug!("Running level: {}", i);
            level
                .par_iter()
                .try_for_each(|chain| run_chain(&graph, chain, &store))?;
        }

        debug!("Finished");
        collect_outputs(&store, outputs)
    }
}

/// Runs chains as soon as their inputs are ready on a fixed number of worker threads.
/// The most recently unblocked chain runs first, which keeps intermediate data short lived.
pub struct GreedyScheduler(usize);

impl GreedyScheduler {
    /// Creates a scheduler with `n_threads` workers (at least one)
    pub fn new(n_threads: usize) -> Self {
        GreedyScheduler(n_threads.max(1))
    }
}

impl Default for GreedyScheduler {
    fn default() -> Self {
        GreedyScheduler::new(thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

impl Scheduler for GreedyScheduler {
    fn compute(
        &mut self,
        graph: Arc<Graph>,
        outputs: &[Arc<Handle>],
    ) -> Result<Vec<Arc<Payload>>, EngineError> {
        let (collapsed, mut outbound) = plan(&graph, outputs);
        let counts = consumer_counts(&graph, &collapsed, outputs);
        let store = Arc::new(Mutex::new(DataStore::new(counts)));

        let mut tick = 0usize;
        let mut queue: PriorityQueue<Chain, usize> = PriorityQueue::new();
        let mut waiting: HashMap<Arc<Handle>, (Chain, HashSet<Arc<Handle>>)> = HashMap::new();
        for (chain, deps) in collapsed.into_iter() {
            if deps.is_empty() {
                queue.push(chain, tick);
            } else {
                waiting.insert(chain[0].clone(), (chain, deps));
            }
        }

        trace!("Output: {:?}", outputs);
        if log_enabled!(Trace) {
            for (head, (chain, deps)) in waiting.iter() {
                trace!("Head: {}, Chain: {:?}, Deps: {:?}", head, chain, deps);
            }
        }

        let pool = ThreadPoolBuilder::new().num_threads(self.0).build()?;
        let (tx, rx) = mpsc::channel();
        let mut running = 0usize;
        let mut failure: Option<EngineError> = None;
        loop {
            // Queue up work for every free worker, unless something already failed
            while failure.is_none() && running < self.0 {
                let Some((chain, _priority)) = queue.pop() else { break };
                trace!("Queueing chain: {:?}", chain);
                let g = graph.clone();
                let s = store.clone();
                let thread_tx = tx.clone();
                pool.spawn(move || {
                    let outcome = run_chain(&g, &chain, &s);
                    let tail = chain[chain.len() - 1].clone();
                    // The receiver only hangs up once every running chain has reported
                    let _ = thread_tx.send((tail, outcome));
                });
                running += 1;
            }

            if running == 0 {
                break;
            }

            let Ok((handle, outcome)) = rx.recv() else { break };
            running -= 1;
            trace!("{} finished", handle);

            if let Err(e) = outcome {
                warn!("Chain ending in {} failed: {}", handle, e);
                if failure.is_none() {
                    failure = Some(e);
                }
                continue;
            }

            for out_handle in outbound.remove(&handle).into_iter().flatten() {
                let ready = match waiting.get_mut(&out_handle) {
                    Some((_chain, deps)) => {
                        deps.remove(&handle);
                        deps.is_empty()
                    }
                    None => false,
                };
                if ready {
                    if let Some((chain, _)) = waiting.remove(&out_handle) {
                        trace!("Adding new chain: {:?}", chain);
                        tick += 1;
                        queue.push(chain, tick);
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        debug!("Finished");
        collect_outputs(&store, outputs)
    }
}

#[cfg(test)]
mod size_test {
    use super::*;

    fn deps(edges: Vec<(usize, Vec<usize>)>) -> HashMap<usize, HashSet<usize>> {
        edges
            .into_iter()
            .map(|(node, ds)| (node, ds.into_iter().collect()))
            .collect()
    }

    #[test]
    fn test_graph_collapse() {
        /*
        1 -> 2 -> 3
              \
               4 -> 5

        We should collapse 1 -> 2 and 4 -> 5
        */
        let graph = deps(vec![(1, vec![]), (2, vec![1]), (3, vec![2]), (4, vec![2]), (5, vec![4])]);
        let out = collapse_graph(graph, &HashSet::new());

        let mut res = HashMap::new();
        res.insert(vec![1, 2], HashSet::new());
        res.insert(vec![3], vec![2].into_iter().collect());
        res.insert(vec![4, 5], vec![2].into_iter().collect());
        assert_eq!(out, res);
    }

    #[test]
    fn test_graph_collapse_diamond() {
        /*
             2 -> 4
            /     |
           1 ---> 3
        */
        let graph = deps(vec![(1, vec![]), (2, vec![1]), (3, vec![1]), (4, vec![2, 3])]);
        let res: HashMap<_, _> = graph.clone().into_iter().map(|(k, v)| (vec![k], v)).collect();
        assert_eq!(collapse_graph(graph, &HashSet::new()), res);
    }

    #[test]
    fn test_graph_collapse_stops_at_outputs() {
        let graph = deps(vec![(1, vec![]), (2, vec![1]), (3, vec![2])]);
        let stops = vec![2].into_iter().collect();
        let out = collapse_graph(graph, &stops);

        let mut res = HashMap::new();
        res.insert(vec![1, 2], HashSet::new());
        res.insert(vec![3], vec![2].into_iter().collect());
        assert_eq!(out, res);
    }

    #[test]
    fn test_data_store_releases_after_last_read() {
        let mut counts = HashMap::new();
        counts.insert("a", 2usize);
        let mut ds = DataStore::new(counts);
        ds.insert("a", 7);
        assert_eq!(ds.get(&"a"), Some(7));
        assert_eq!(ds.get(&"a"), Some(7));
        assert_eq!(ds.get(&"a"), None);
    }
}
