/// A TLS message buffer with reserved head room.
///
/// The buffer holds `head_len` bytes of head room followed by `total_len` bytes of payload.
/// The head room belongs to whoever frames the payload (EAP-TLS flags and length); payload
/// accessors never expose it. `handled_len` counts payload bytes already received, or already
/// acknowledged by the peer when sending, and never exceeds `total_len`.
#[derive(Debug, Default)]
pub struct TlsData {
    data: Option<Vec<u8>>,
    head_len: usize,
    total_len: usize,
    handled_len: usize,
}

fn try_zeroed(len: usize) -> Option<Vec<u8>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).ok()?;
    v.resize(len, 0);
    Some(v)
}

impl TlsData {
    pub const fn new() -> Self {
        Self { data: None, head_len: 0, total_len: 0, handled_len: 0 }
    }

    /// Resets to the empty state, releasing any buffer.
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Allocates `head_len` bytes of head room and `len` zeroed payload bytes.
    /// Returns false if the memory is not available.
    pub fn allocate(&mut self, head_len: usize, len: usize) -> bool {
        self.init();
        match head_len.checked_add(len).and_then(try_zeroed) {
            Some(data) => {
                self.data = Some(data);
                self.head_len = head_len;
                self.total_len = len;
                true
            }
            None => false,
        }
    }

    /// Grows or shrinks the payload to `new_total_len`, keeping the head room and the
    /// existing payload bytes.
    pub fn realloc(&mut self, new_total_len: usize) -> bool {
        let Some(data) = self.data.as_mut() else {
            return false;
        };
        let new_len = self.head_len + new_total_len;
        if new_len > data.len() && data.try_reserve_exact(new_len - data.len()).is_err() {
            return false;
        }
        data.resize(new_len, 0);
        self.total_len = new_total_len;
        self.handled_len = self.handled_len.min(new_total_len);
        true
    }

    pub fn free(&mut self) {
        self.init();
    }

    /// True when no message is held.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn head_len(&self) -> usize {
        self.head_len
    }

    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn handled_len(&self) -> usize {
        self.handled_len
    }

    /// Payload bytes not yet handled.
    pub fn remaining(&self) -> usize {
        self.total_len - self.handled_len
    }

    pub fn is_complete(&self) -> bool {
        self.data.is_some() && self.handled_len == self.total_len
    }

    pub fn payload(&self) -> &[u8] {
        match &self.data {
            Some(data) => &data[self.head_len..],
            None => &[],
        }
    }

    /// The head room in front of the payload.
    pub fn header_mut(&mut self) -> &mut [u8] {
        match &mut self.data {
            Some(data) => &mut data[..self.head_len],
            None => &mut [],
        }
    }

    /// Marks `len` more payload bytes as handled, bounded by the payload length.
    pub fn handled_advance(&mut self, len: usize) {
        self.handled_len = (self.handled_len + len).min(self.total_len);
    }

    /// Copies received bytes to the unhandled part of the payload. Returns false, and writes
    /// nothing, if they do not fit.
    pub fn receive(&mut self, bytes: &[u8]) -> bool {
        let Some(data) = self.data.as_mut() else {
            return false;
        };
        if bytes.len() > self.total_len - self.handled_len {
            return false;
        }
        let start = self.head_len + self.handled_len;
        data[start..start + bytes.len()].copy_from_slice(bytes);
        self.handled_len += bytes.len();
        true
    }

    /// Appends bytes to the end of the payload, allocating on first use.
    pub fn append(&mut self, head_len: usize, bytes: &[u8]) -> bool {
        if self.data.is_none() && !self.allocate(head_len, 0) {
            return false;
        }
        let old = self.total_len;
        if !self.realloc(old + bytes.len()) {
            return false;
        }
        if let Some(data) = self.data.as_mut() {
            let start = self.head_len + old;
            data[start..].copy_from_slice(bytes);
        }
        true
    }

    /// Takes the payload out, leaving the buffer empty.
    pub fn take_payload(&mut self) -> Vec<u8> {
        let head_len = self.head_len;
        let data = self.data.take();
        self.init();
        match data {
            Some(mut data) => {
                data.drain(..head_len);
                data
            }
            None => Vec::new(),
        }
    }
}
