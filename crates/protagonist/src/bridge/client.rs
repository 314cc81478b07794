use serde_json::Value;
use tokio::sync::oneshot;

use crate::bridge::dispatch::ParseOutput;
use crate::bridge::{Argument, Bridge, ParseTask, Scheduler};
use crate::Result;

impl<S: Scheduler<ParseTask>> Bridge<S> {
    /// Schedule a parse and receive its output through a channel instead of a
    /// callback.
    ///
    /// The receiver resolves once the scheduler delivers the completion, so
    /// completions must be driven (e.g. `ThreadPoolScheduler::run`) while it
    /// is awaited.
    pub fn parse_async(
        &self,
        source: impl Into<String>,
        options: Option<Value>,
    ) -> Result<oneshot::Receiver<ParseOutput>> {
        // Create channel
        let (tx, rx) = oneshot::channel();

        let mut args = vec![Argument::from(source.into())];
        args.extend(options.map(Argument::from));
        args.push(Argument::function(move |error, result| {
            if tx.send(ParseOutput { error, result }).is_err() {
                tracing::trace!("Receiver dropped before the parse output arrived");
            }
            Ok(())
        }));

        self.parse(args)?;

        // Return receiver
        Ok(rx)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::bridge::{Bridge, InlineScheduler, ThreadPoolScheduler};

    #[tokio::test]
    async fn test_parse_async_inline() {
        let bridge = Bridge::new(InlineScheduler::new());

        let rx = bridge.parse_async("# API\n", None).unwrap();
        bridge.scheduler().run_pending();

        let output = rx.await.unwrap();
        assert!(output.error.is_none());
        assert_eq!(output.result["content"][0]["meta"]["title"], "API");
    }

    #[tokio::test]
    async fn test_parse_async_pool() {
        let bridge = Bridge::new(ThreadPoolScheduler::new(2).unwrap());

        let rx = bridge
            .parse_async("# API\n", Some(json!({ "type": "ast" })))
            .unwrap();
        let (output, delivered) = tokio::join!(rx, bridge.scheduler().run());

        assert_eq!(delivered, 1);
        assert_eq!(output.unwrap().result["ast"]["name"], "API");
    }

    #[test]
    fn test_parse_async_rejects_bad_options() {
        let bridge = Bridge::new(InlineScheduler::new());
        assert!(bridge.parse_async("# API", Some(json!("ast"))).is_err());
        assert_eq!(bridge.live_tasks(), 0);
    }
}
