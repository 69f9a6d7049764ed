/// Fixed-capacity circular buffer keeping the most recent elements.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T>
where
    T: Copy + Default,
{
    /// Creates an empty buffer holding at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![T::default(); capacity],
            head: 0,
            len: 0,
        }
    }

    /// Appends `x`, overwriting the oldest element when the buffer is full.
    pub fn push(&mut self, x: T) {
        let capacity = self.buf.len();
        if capacity == 0 {
            return;
        }
        self.buf[self.head] = x;
        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    /// Forgets all the elements.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Replaces the content of `out` with the last `min(k, len)` elements, oldest first.
    pub fn copy_last(&self, k: usize, out: &mut Vec<T>) {
        out.clear();
        let k = k.min(self.len);
        let capacity = self.buf.len();
        // head <= capacity and k <= capacity, so this never underflows.
        let start = (self.head + capacity - k) % capacity.max(1);
        if start + k <= capacity {
            out.extend_from_slice(&self.buf[start..start + k]);
        } else {
            out.extend_from_slice(&self.buf[start..]);
            out.extend_from_slice(&self.buf[..start + k - capacity]);
        }
    }
}
