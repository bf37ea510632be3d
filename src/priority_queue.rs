/// Addressable max-priority queue over dense element ids.
///
/// A binary heap augmented with a locator array, so any element can be
/// looked up, re-keyed, or removed by id: O(1) `contains`/`key`, O(log n)
/// everything else. Keys only need `PartialOrd`, which lets the same queue
/// carry integer gains and floating-point ratings.
pub struct PriorityQueue<K> {
    heap: Vec<(K, usize)>,
    /// Position of each id in `heap`, or NOT_PRESENT.
    locator: Vec<usize>,
}

const NOT_PRESENT: usize = usize::MAX;

impl<K: PartialOrd + Copy> PriorityQueue<K> {
    /// Create a queue able to hold ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        PriorityQueue {
            heap: Vec::with_capacity(capacity),
            locator: vec![NOT_PRESENT; capacity],
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.locator[id] != NOT_PRESENT
    }

    pub fn key(&self, id: usize) -> K {
        debug_assert!(self.contains(id));
        self.heap[self.locator[id]].0
    }

    /// Id with the maximum key, if any.
    pub fn max(&self) -> Option<usize> {
        self.heap.first().map(|&(_, id)| id)
    }

    pub fn max_key(&self) -> Option<K> {
        self.heap.first().map(|&(key, _)| key)
    }

    pub fn insert(&mut self, id: usize, key: K) {
        debug_assert!(!self.contains(id), "id {id} is already queued");
        self.heap.push((key, id));
        let pos = self.heap.len() - 1;
        self.locator[id] = pos;
        self.sift_up(pos);
    }

    /// Re-key an element, sifting in whichever direction is needed.
    pub fn update_key(&mut self, id: usize, key: K) {
        debug_assert!(self.contains(id));
        let pos = self.locator[id];
        let old = self.heap[pos].0;
        self.heap[pos].0 = key;
        if key > old {
            self.sift_up(pos);
        } else {
            self.sift_down(pos);
        }
    }

    pub fn increase_key(&mut self, id: usize, key: K) {
        debug_assert!(self.contains(id));
        debug_assert!(key >= self.key(id));
        let pos = self.locator[id];
        self.heap[pos].0 = key;
        self.sift_up(pos);
    }

    pub fn decrease_key(&mut self, id: usize, key: K) {
        debug_assert!(self.contains(id));
        debug_assert!(key <= self.key(id));
        let pos = self.locator[id];
        self.heap[pos].0 = key;
        self.sift_down(pos);
    }

    pub fn remove(&mut self, id: usize) {
        debug_assert!(self.contains(id));
        let pos = self.locator[id];
        self.locator[id] = NOT_PRESENT;
        let last = self.heap.len() - 1;
        if pos != last {
            self.heap.swap(pos, last);
            self.heap.pop();
            let moved = self.heap[pos].1;
            self.locator[moved] = pos;
            self.sift_up(pos);
            let pos = self.locator[moved];
            self.sift_down(pos);
        } else {
            self.heap.pop();
        }
    }

    pub fn pop_max(&mut self) -> Option<(usize, K)> {
        let &(key, id) = self.heap.first()?;
        self.remove(id);
        Some((id, key))
    }

    pub fn clear(&mut self) {
        for &(_, id) in &self.heap {
            self.locator[id] = NOT_PRESENT;
        }
        self.heap.clear();
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].0 > self.heap[parent].0 {
                self.heap.swap(pos, parent);
                self.locator[self.heap[pos].1] = pos;
                self.locator[self.heap[parent].1] = parent;
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let left = 2 * pos + 1;
            let right = 2 * pos + 2;
            let mut largest = pos;
            if left < self.heap.len() && self.heap[left].0 > self.heap[largest].0 {
                largest = left;
            }
            if right < self.heap.len() && self.heap[right].0 > self.heap[largest].0 {
                largest = right;
            }
            if largest == pos {
                break;
            }
            self.heap.swap(pos, largest);
            self.locator[self.heap[pos].1] = pos;
            self.locator[self.heap[largest].1] = largest;
            pos = largest;
        }
    }
}

/// k addressable queues with per-part enable bits and a global maximum over
/// the enabled parts. An element may be queued in several parts at once with
/// different keys. Disabled parts keep their entries but are skipped when
/// selecting the next move.
pub struct KWayPriorityQueue<K> {
    queues: Vec<PriorityQueue<K>>,
    enabled: Vec<bool>,
}

impl<K: PartialOrd + Copy> KWayPriorityQueue<K> {
    pub fn new(k: usize, capacity: usize) -> Self {
        KWayPriorityQueue {
            queues: (0..k).map(|_| PriorityQueue::new(capacity)).collect(),
            enabled: vec![true; k],
        }
    }

    pub fn is_enabled(&self, part: usize) -> bool {
        self.enabled[part]
    }

    pub fn enable_part(&mut self, part: usize) {
        self.enabled[part] = true;
    }

    pub fn disable_part(&mut self, part: usize) {
        self.enabled[part] = false;
    }

    pub fn contains(&self, id: usize, part: usize) -> bool {
        self.queues[part].contains(id)
    }

    pub fn contains_anywhere(&self, id: usize) -> bool {
        self.queues.iter().any(|pq| pq.contains(id))
    }

    pub fn key(&self, id: usize, part: usize) -> K {
        self.queues[part].key(id)
    }

    pub fn size(&self, part: usize) -> usize {
        self.queues[part].len()
    }

    /// True when no enabled part has a queued element.
    pub fn is_empty(&self) -> bool {
        self.queues
            .iter()
            .zip(&self.enabled)
            .all(|(pq, &on)| !on || pq.is_empty())
    }

    pub fn insert(&mut self, id: usize, part: usize, key: K) {
        self.queues[part].insert(id, key);
    }

    pub fn update_key(&mut self, id: usize, part: usize, key: K) {
        self.queues[part].update_key(id, key);
    }

    pub fn remove(&mut self, id: usize, part: usize) {
        self.queues[part].remove(id);
    }

    /// Drop `id` from every part queue it is in.
    pub fn remove_everywhere(&mut self, id: usize) {
        for pq in &mut self.queues {
            if pq.contains(id) {
                pq.remove(id);
            }
        }
    }

    /// (id, part, key) of the best element over all enabled parts.
    pub fn max(&self) -> Option<(usize, usize, K)> {
        let mut best: Option<(usize, usize, K)> = None;
        for (part, pq) in self.queues.iter().enumerate() {
            if !self.enabled[part] {
                continue;
            }
            if let (Some(id), Some(key)) = (pq.max(), pq.max_key()) {
                if best.map_or(true, |(_, _, bk)| key > bk) {
                    best = Some((id, part, key));
                }
            }
        }
        best
    }

    pub fn pop_max(&mut self) -> Option<(usize, usize, K)> {
        let (id, part, key) = self.max()?;
        self.queues[part].remove(id);
        Some((id, part, key))
    }

    /// Pop the best element of one specific part queue.
    pub fn pop_max_from(&mut self, part: usize) -> Option<(usize, K)> {
        self.queues[part].pop_max()
    }

    pub fn clear(&mut self) {
        for pq in &mut self.queues {
            pq.clear();
        }
        self.enabled.fill(true);
    }
}
