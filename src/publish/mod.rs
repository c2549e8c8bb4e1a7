//! Publishing free-throw updates
//!
//! A [`Channel`] is where updates are posted; a [`Notifier`] gets a copy of
//! every successful post. [`Publisher`] ties the two together and refuses to
//! post the same text twice in a row.

pub mod message;
pub mod oauth;
pub mod telegram;
pub mod twitter;

use crate::Result;

pub use message::{compose, MessageSettings};
pub use telegram::TelegramNotifier;
pub use twitter::TwitterChannel;

/// Identifier assigned to a new post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReceipt {
    pub id: String,
}

/// What [`Publisher::publish`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { id: String },
    /// The latest post already has this exact text
    Duplicate,
}

/// A place updates are posted to
pub trait Channel {
    /// Text of the most recent post, if there is one
    fn latest_post(&self) -> Result<Option<String>>;

    fn post(&self, text: &str) -> Result<PostReceipt>;
}

/// Side channel told about each new post
pub trait Notifier {
    fn notify(&self, text: &str) -> Result<()>;
}

pub struct Publisher<'a> {
    channel: &'a dyn Channel,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> Publisher<'a> {
    pub fn new(channel: &'a dyn Channel) -> Self {
        Publisher {
            channel,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Post `text` unless it matches the latest post exactly.
    ///
    /// Notifier failures are logged and otherwise ignored.
    pub fn publish(&self, text: &str) -> Result<PublishOutcome> {
        if self.channel.latest_post()?.as_deref() == Some(text) {
            log::info!("Latest post already has this text, skipping");
            return Ok(PublishOutcome::Duplicate);
        }

        let receipt = self.channel.post(text)?;
        log::info!("Published post {}", receipt.id);

        if let Some(notifier) = self.notifier {
            if let Err(e) = notifier.notify(text) {
                log::warn!("Notification failed: {}", e);
            }
        }

        Ok(PublishOutcome::Published { id: receipt.id })
    }
}

/// Logs instead of posting
#[derive(Debug, Default)]
pub struct DryRunChannel;

impl Channel for DryRunChannel {
    fn latest_post(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn post(&self, text: &str) -> Result<PostReceipt> {
        log::info!("[dry run] would post ({} chars): {}", text.chars().count(), text);
        Ok(PostReceipt {
            id: "dry-run".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharityError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeChannel {
        posts: RefCell<Vec<String>>,
        fail_post: bool,
    }

    impl Channel for FakeChannel {
        fn latest_post(&self) -> Result<Option<String>> {
            Ok(self.posts.borrow().last().cloned())
        }

        fn post(&self, text: &str) -> Result<PostReceipt> {
            if self.fail_post {
                return Err(CharityError::Publish {
                    status: 403,
                    body: "forbidden".to_string(),
                });
            }
            self.posts.borrow_mut().push(text.to_string());
            Ok(PostReceipt {
                id: self.posts.borrow().len().to_string(),
            })
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Notifier for FakeNotifier {
        fn notify(&self, text: &str) -> Result<()> {
            if self.fail {
                return Err(CharityError::Publish {
                    status: 500,
                    body: String::new(),
                });
            }
            self.sent.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_publish_then_duplicate() {
        let channel = FakeChannel::default();
        let notifier = FakeNotifier::default();
        let publisher = Publisher::new(&channel).with_notifier(&notifier);

        assert_eq!(
            publisher.publish("UC shot 12/20").unwrap(),
            PublishOutcome::Published { id: "1".to_string() }
        );
        assert_eq!(
            publisher.publish("UC shot 12/20").unwrap(),
            PublishOutcome::Duplicate
        );
        assert_eq!(channel.posts.borrow().len(), 1);
        assert_eq!(notifier.sent.borrow().as_slice(), ["UC shot 12/20"]);
    }

    #[test]
    fn test_near_duplicate_is_posted() {
        let channel = FakeChannel::default();
        let publisher = Publisher::new(&channel);
        publisher.publish("UC shot 12/20.").unwrap();
        assert!(matches!(
            publisher.publish("UC shot 12/20").unwrap(),
            PublishOutcome::Published { .. }
        ));
    }

    #[test]
    fn test_notifier_failure_is_not_fatal() {
        let channel = FakeChannel::default();
        let notifier = FakeNotifier {
            fail: true,
            ..Default::default()
        };
        let publisher = Publisher::new(&channel).with_notifier(&notifier);
        assert!(publisher.publish("hello").is_ok());
    }

    #[test]
    fn test_post_failure_skips_notification() {
        let channel = FakeChannel {
            fail_post: true,
            ..Default::default()
        };
        let notifier = FakeNotifier::default();
        let publisher = Publisher::new(&channel).with_notifier(&notifier);

        assert!(matches!(
            publisher.publish("hello"),
            Err(CharityError::Publish { status: 403, .. })
        ));
        assert!(notifier.sent.borrow().is_empty());
    }

    #[test]
    fn test_dry_run_never_duplicates() {
        let channel = DryRunChannel;
        let publisher = Publisher::new(&channel);
        for _ in 0..2 {
            assert_eq!(
                publisher.publish("hello").unwrap(),
                PublishOutcome::Published { id: "dry-run".to_string() }
            );
        }
    }
}
