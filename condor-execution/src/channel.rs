use derive_more::Constructor;

/// Construct an unbounded channel pair for broker callback delivery.
pub fn unbounded_channel<T>() -> (UnboundedTx<T>, UnboundedRx<T>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (UnboundedTx::new(tx), UnboundedRx::new(rx))
}

/// Sending half, cloned into the broker adapter's I/O tasks.
#[derive(Debug, Constructor)]
pub struct UnboundedTx<T> {
    pub tx: tokio::sync::mpsc::UnboundedSender<T>,
}

impl<T> Clone for UnboundedTx<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> UnboundedTx<T> {
    /// Send an item; a dropped receiver returns it back.
    pub fn send(&self, item: T) -> Result<(), T> {
        self.tx.send(item).map_err(|err| err.0)
    }
}

/// Receiving half, owned by the engine.
#[derive(Debug, Constructor)]
pub struct UnboundedRx<T> {
    pub rx: tokio::sync::mpsc::UnboundedReceiver<T>,
}

impl<T> UnboundedRx<T> {
    /// Drain every item currently queued without waiting for more.
    ///
    /// The engine calls this at the top of each loop iteration; it never
    /// blocks the cooperative loop.
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }

    pub fn into_stream(self) -> tokio_stream::wrappers::UnboundedReceiverStream<T> {
        tokio_stream::wrappers::UnboundedReceiverStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_is_non_blocking() {
        let (tx, mut rx) = unbounded_channel();
        assert!(rx.drain().is_empty());

        tx.send(1).unwrap();
        tx.send(2).unwrap();
        assert_eq!(rx.drain(), vec![1, 2]);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        assert_eq!(tx.send(42), Err(42));
    }
}
