use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::events::{Attribution, ImageSource, LoadFailed, LoadImage, LoadOutcome, PreparedImage};

/// The picture currently on screen together with its credit line.
#[derive(Debug, Clone)]
pub struct ActiveImage {
    pub generation: u64,
    pub source: ImageSource,
    pub prepared: Arc<PreparedImage>,
    pub attribution: Option<Attribution>,
}

/// What applying a load outcome did to the slot.
#[derive(Debug)]
pub enum SlotUpdate {
    /// The outcome was current and replaced the active image.
    Swapped,
    /// The current request failed; the active image is unchanged.
    Rejected(LoadFailed),
    /// A newer request was issued after this one; the outcome was dropped.
    Stale { generation: u64, latest: u64 },
}

/// Holds the active image and guards it with a generation counter so a slow
/// request can never overwrite the result of a newer one.
#[derive(Debug, Default)]
pub struct ImageSlot {
    issued: u64,
    active: Option<ActiveImage>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a request for `source` with the next generation. Any request
    /// issued earlier becomes stale.
    pub fn issue(&mut self, source: ImageSource) -> LoadImage {
        self.issued += 1;
        LoadImage {
            generation: self.issued,
            source,
        }
    }

    /// Issue a request for `source` only once `tx` has room for it. A full or
    /// closed queue hands the source back and leaves the generation alone, so
    /// a load already in flight stays current.
    pub fn try_issue(
        &mut self,
        tx: &mpsc::Sender<LoadImage>,
        source: ImageSource,
    ) -> Result<u64, TrySendError<ImageSource>> {
        let permit = match tx.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => return Err(TrySendError::Full(source)),
            Err(TrySendError::Closed(())) => return Err(TrySendError::Closed(source)),
        };
        let request = self.issue(source);
        let generation = request.generation;
        permit.send(request);
        Ok(generation)
    }

    /// True while the bundled pair is on screen, or nothing is yet.
    pub fn follows_bundled(&self) -> bool {
        self.active
            .as_ref()
            .is_none_or(|active| matches!(active.source, ImageSource::Bundled { .. }))
    }

    pub fn latest_issued(&self) -> u64 {
        self.issued
    }

    pub fn active(&self) -> Option<&ActiveImage> {
        self.active.as_ref()
    }

    pub fn apply(&mut self, outcome: LoadOutcome) -> SlotUpdate {
        let generation = outcome.generation();
        if generation != self.issued {
            debug!(generation, latest = self.issued, "dropping stale image load");
            return SlotUpdate::Stale {
                generation,
                latest: self.issued,
            };
        }
        match outcome {
            LoadOutcome::Loaded(loaded) => {
                self.active = Some(ActiveImage {
                    generation: loaded.generation,
                    source: loaded.source,
                    prepared: Arc::new(loaded.prepared),
                    attribution: loaded.attribution,
                });
                SlotUpdate::Swapped
            }
            LoadOutcome::Failed(failed) => SlotUpdate::Rejected(failed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcquireError;
    use crate::events::ImageLoaded;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    fn loaded(generation: u64, shade: u8, credit: Option<&str>) -> LoadOutcome {
        LoadOutcome::Loaded(ImageLoaded {
            generation,
            source: ImageSource::File(PathBuf::from(format!("{shade}.png"))),
            prepared: PreparedImage {
                color: RgbaImage::from_pixel(1, 1, Rgba([shade, shade, shade, 255])),
                gray: None,
            },
            attribution: credit.map(|text| Attribution {
                text: text.to_string(),
                url: "https://example.com".to_string(),
            }),
        })
    }

    #[test]
    fn newest_request_wins_regardless_of_completion_order() {
        let mut slot = ImageSlot::new();
        let first = slot.issue(ImageSource::Remote {
            topic: "storm".into(),
        });
        let second = slot.issue(ImageSource::File(PathBuf::from("b.png")));

        assert!(matches!(
            slot.apply(loaded(second.generation, 2, None)),
            SlotUpdate::Swapped
        ));
        assert!(matches!(
            slot.apply(loaded(first.generation, 1, Some("late photographer"))),
            SlotUpdate::Stale { generation: 1, latest: 2 }
        ));

        let active = slot.active().unwrap();
        assert_eq!(active.generation, 2);
        assert_eq!(active.prepared.color.get_pixel(0, 0).0[0], 2);
        assert!(active.attribution.is_none());
    }

    #[test]
    fn failure_keeps_previous_image_and_credit() {
        let mut slot = ImageSlot::new();
        let req = slot.issue(ImageSource::Remote {
            topic: "flood".into(),
        });
        slot.apply(loaded(req.generation, 9, Some("someone")));

        let req = slot.issue(ImageSource::Remote {
            topic: "drought".into(),
        });
        let update = slot.apply(LoadOutcome::Failed(LoadFailed {
            generation: req.generation,
            source: req.source,
            error: AcquireError::NoImageUrl,
        }));
        assert!(matches!(update, SlotUpdate::Rejected(_)));

        let active = slot.active().unwrap();
        assert_eq!(active.prepared.color.get_pixel(0, 0).0[0], 9);
        assert_eq!(active.attribution.as_ref().unwrap().text, "someone");
    }

    #[test]
    fn full_queue_keeps_the_in_flight_request_current() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut slot = ImageSlot::new();

        let first = slot
            .try_issue(&tx, ImageSource::File(PathBuf::from("a.png")))
            .unwrap();
        let refused = slot.try_issue(&tx, ImageSource::File(PathBuf::from("b.png")));
        assert!(matches!(refused, Err(TrySendError::Full(ImageSource::File(_)))));
        assert_eq!(slot.latest_issued(), first);

        let queued = rx.try_recv().unwrap();
        assert_eq!(queued.generation, first);
        assert!(matches!(
            slot.apply(loaded(queued.generation, 4, None)),
            SlotUpdate::Swapped
        ));
        assert_eq!(slot.active().unwrap().generation, first);
    }

    #[test]
    fn closed_queue_issues_nothing() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut slot = ImageSlot::new();
        let refused = slot.try_issue(&tx, ImageSource::Remote { topic: "wind".into() });
        assert!(matches!(refused, Err(TrySendError::Closed(_))));
        assert_eq!(slot.latest_issued(), 0);
    }

    #[test]
    fn only_bundled_images_follow_the_files_on_disk() {
        let mut slot = ImageSlot::new();
        assert!(slot.follows_bundled());

        let req = slot.issue(ImageSource::Bundled {
            color: PathBuf::from("assets/image-color.jpg"),
            gray: None,
        });
        slot.apply(LoadOutcome::Loaded(ImageLoaded {
            generation: req.generation,
            source: req.source,
            prepared: PreparedImage {
                color: RgbaImage::new(1, 1),
                gray: None,
            },
            attribution: None,
        }));
        assert!(slot.follows_bundled());

        let req = slot.issue(ImageSource::File(PathBuf::from("7.png")));
        slot.apply(loaded(req.generation, 7, None));
        assert!(!slot.follows_bundled());
    }

    #[test]
    fn stale_failures_are_ignored() {
        let mut slot = ImageSlot::new();
        let old = slot.issue(ImageSource::File(PathBuf::from("a.png")));
        let _new = slot.issue(ImageSource::File(PathBuf::from("b.png")));
        let update = slot.apply(LoadOutcome::Failed(LoadFailed {
            generation: old.generation,
            source: old.source,
            error: AcquireError::Task("boom".into()),
        }));
        assert!(matches!(update, SlotUpdate::Stale { .. }));
        assert!(slot.active().is_none());
    }
}
