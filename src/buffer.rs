use std::sync::Mutex;

/// Capacity a returned buffer is allowed to keep. One pathological record
/// must not strand a huge allocation in the pool.
pub const MAX_RETAINED_CAPACITY: usize = 1024;

const MAX_POOLED_BUFFERS: usize = 16;

/// Pool of reusable scratch buffers for formatter output.
///
/// Buffers are taken per log call and returned after the formatted entry is
/// enqueued. Return clears the buffer and caps its capacity, so reuse never
/// leaks content or growth between records.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: Mutex<Vec<String>>,
}

impl BufferPool {
    pub fn new() -> Self {
        BufferPool::default()
    }

    pub fn take(&self) -> String {
        self.free
            .lock()
            .expect("buffer pool lock poisoned")
            .pop()
            .unwrap_or_default()
    }

    pub fn put(&self, mut buf: String) {
        buf.clear();
        buf.shrink_to(MAX_RETAINED_CAPACITY);
        let mut free = self.free.lock().expect("buffer pool lock poisoned");
        if free.len() < MAX_POOLED_BUFFERS {
            free.push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_buffers_are_cleared() {
        let pool = BufferPool::new();
        let mut buf = pool.take();
        buf.push_str("leftover");
        pool.put(buf);
        assert_eq!(pool.take(), "");
    }

    #[test]
    fn returned_buffers_cap_retained_capacity() {
        let pool = BufferPool::new();
        let mut buf = pool.take();
        buf.push_str(&"x".repeat(64 * 1024));
        pool.put(buf);
        let reused = pool.take();
        assert!(reused.capacity() <= MAX_RETAINED_CAPACITY);
    }

    #[test]
    fn pool_size_is_bounded() {
        let pool = BufferPool::new();
        let buffers: Vec<String> = (0..64).map(|_| pool.take()).collect();
        for buf in buffers {
            pool.put(buf);
        }
        let held = pool.free.lock().unwrap().len();
        assert!(held <= MAX_POOLED_BUFFERS);
    }
}
