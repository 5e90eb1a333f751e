//! Batch texture loading with aggregate progress tracking.
//!
//! [`TextureLoader`] fans fetches out to background tasks and funnels the
//! decoded images back through a channel. Nothing here ever blocks the
//! event-loop thread: [`poll`](TextureLoader::poll) drains whatever has
//! resolved since the last frame and stores the pixels into the texture
//! handles, where the next material refresh picks them up.

use futures::channel::mpsc;
use image::RgbaImage;

use crate::data_structures::texture::TextureHandle;
use crate::resources::load_image;

/// Counters for a batch of loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub pending: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl LoadProgress {
    pub fn total(&self) -> usize {
        self.pending + self.succeeded + self.failed
    }
}

/// Tracks a batch of asset loads and fires lifecycle callbacks.
///
/// `on_start` fires when the first item is enqueued and `on_load` fires
/// exactly once when every item has settled, counting failures as settled.
/// A batch with failures still completes; the failed slots just keep their
/// placeholder pixels.
#[derive(Default)]
pub struct LoadingManager {
    total: usize,
    succeeded: usize,
    failed: usize,
    started: bool,
    completed: bool,
    on_start: Option<Box<dyn FnMut()>>,
    on_progress: Option<Box<dyn FnMut(&str, LoadProgress)>>,
    on_load: Option<Box<dyn FnMut(LoadProgress)>>,
    on_error: Option<Box<dyn FnMut(&str)>>,
}

impl LoadingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    pub fn on_progress(mut self, callback: impl FnMut(&str, LoadProgress) + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn on_load(mut self, callback: impl FnMut(LoadProgress) + 'static) -> Self {
        self.on_load = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnMut(&str) + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Announce `count` additional items. Fires `on_start` the first time.
    pub fn begin(&mut self, count: usize) {
        self.total += count;
        if !self.started && self.total > 0 {
            self.started = true;
            if let Some(callback) = &mut self.on_start {
                callback();
            }
        }
    }

    pub fn item_loaded(&mut self, name: &str) {
        self.succeeded += 1;
        let progress = self.progress();
        if let Some(callback) = &mut self.on_progress {
            callback(name, progress);
        }
        self.maybe_complete();
    }

    pub fn item_failed(&mut self, name: &str) {
        self.failed += 1;
        if let Some(callback) = &mut self.on_error {
            callback(name);
        }
        self.maybe_complete();
    }

    pub fn progress(&self) -> LoadProgress {
        LoadProgress {
            pending: self.total - self.succeeded - self.failed,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn maybe_complete(&mut self) {
        if !self.completed && self.total > 0 && self.succeeded + self.failed == self.total {
            self.completed = true;
            let progress = self.progress();
            if let Some(callback) = &mut self.on_load {
                callback(progress);
            }
        }
    }
}

struct Fetched {
    name: String,
    result: anyhow::Result<RgbaImage>,
}

struct Slot {
    name: String,
    handle: TextureHandle,
    tracked: bool,
}

/// Fans texture fetches out to background tasks and routes the results into
/// the registered texture handles.
pub struct TextureLoader {
    manager: LoadingManager,
    slots: Vec<Slot>,
    tx: mpsc::UnboundedSender<Fetched>,
    rx: mpsc::UnboundedReceiver<Fetched>,
}

impl TextureLoader {
    pub fn new(manager: LoadingManager) -> Self {
        let (tx, rx) = mpsc::unbounded();
        Self {
            manager,
            slots: Vec::new(),
            tx,
            rx,
        }
    }

    pub fn manager(&self) -> &LoadingManager {
        &self.manager
    }

    /// Kick off a tracked fetch. The manager counts this item toward batch
    /// completion.
    pub fn enqueue(&mut self, name: &str, path: &str, handle: TextureHandle) {
        self.manager.begin(1);
        self.register(name, handle, true);
        self.fetch(name, path);
    }

    /// Fetch outside the manager's accounting. The image still lands in the
    /// handle on the usual deferred path.
    pub fn enqueue_untracked(&mut self, name: &str, path: &str, handle: TextureHandle) {
        self.register(name, handle, false);
        self.fetch(name, path);
    }

    fn register(&mut self, name: &str, handle: TextureHandle, tracked: bool) {
        self.slots.push(Slot {
            name: name.to_owned(),
            handle,
            tracked,
        });
    }

    fn fetch(&self, name: &str, path: &str) {
        let tx = self.tx.clone();
        let name = name.to_owned();
        let path = path.to_owned();
        spawn(async move {
            let result = load_image(&path).await;
            // The receiver only goes away when the loader does.
            let _ = tx.unbounded_send(Fetched { name, result });
        });
    }

    /// Drain everything that resolved since the last frame. Returns true
    /// when at least one texture received new pixels.
    pub fn poll(&mut self) -> bool {
        let mut updated = false;
        while let Ok(Some(fetched)) = self.rx.try_next() {
            let Some(slot) = self.slots.iter().find(|s| s.name == fetched.name) else {
                log::warn!("dropping fetch result for unregistered texture {:?}", fetched.name);
                continue;
            };
            match fetched.result {
                Ok(image) => {
                    slot.handle
                        .lock()
                        .expect("texture mutex poisoned")
                        .set_image(image);
                    updated = true;
                    if slot.tracked {
                        let name = fetched.name.clone();
                        self.manager.item_loaded(&name);
                    }
                }
                Err(err) => {
                    log::warn!("failed to load texture {:?}: {err:#}", fetched.name);
                    if slot.tracked {
                        let name = fetched.name.clone();
                        self.manager.item_failed(&name);
                    }
                }
            }
        }
        updated
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn<F>(future: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(future);
}

#[cfg(target_arch = "wasm32")]
fn spawn<F>(future: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::texture::{SamplerConfig, Texture};
    use std::cell::Cell;
    use std::rc::Rc;

    fn handle(label: &str) -> TextureHandle {
        Texture::new(label, SamplerConfig::default(), [127, 127, 127, 255]).into_handle()
    }

    fn resolve(loader: &TextureLoader, name: &str, result: anyhow::Result<RgbaImage>) {
        loader
            .tx
            .unbounded_send(Fetched {
                name: name.to_owned(),
                result,
            })
            .unwrap();
    }

    #[test]
    fn manager_completes_once_when_all_items_settle() {
        let loads = Rc::new(Cell::new(0));
        let errors = Rc::new(Cell::new(0));
        let loads_cb = loads.clone();
        let errors_cb = errors.clone();
        let mut manager = LoadingManager::new()
            .on_load(move |_| loads_cb.set(loads_cb.get() + 1))
            .on_error(move |_| errors_cb.set(errors_cb.get() + 1));

        manager.begin(3);
        manager.item_loaded("a");
        manager.item_loaded("b");
        assert!(!manager.is_complete());
        assert_eq!(loads.get(), 0);

        // The failing third item still settles the batch.
        manager.item_failed("c");
        assert!(manager.is_complete());
        assert_eq!(loads.get(), 1);
        assert_eq!(errors.get(), 1);
        assert_eq!(
            manager.progress(),
            LoadProgress {
                pending: 0,
                succeeded: 2,
                failed: 1,
            }
        );
    }

    #[test]
    fn on_start_fires_once_across_staggered_begins() {
        let starts = Rc::new(Cell::new(0));
        let starts_cb = starts.clone();
        let mut manager = LoadingManager::new().on_start(move || starts_cb.set(starts_cb.get() + 1));
        manager.begin(1);
        manager.begin(2);
        assert_eq!(starts.get(), 1);
        assert_eq!(manager.progress().pending, 3);
    }

    #[test]
    fn poll_stores_pixels_and_flags_the_texture() {
        let mut loader = TextureLoader::new(LoadingManager::new());
        let color = handle("color");
        loader.manager.begin(1);
        loader.register("color", color.clone(), true);

        assert!(!loader.poll());
        resolve(&loader, "color", Ok(RgbaImage::new(2, 2)));
        assert!(loader.poll());

        let texture = color.lock().unwrap();
        assert!(texture.is_loaded());
        assert!(texture.needs_update());
        assert!(loader.manager.is_complete());
    }

    #[test]
    fn failed_fetch_keeps_the_placeholder_but_settles_the_batch() {
        let mut loader = TextureLoader::new(LoadingManager::new());
        let color = handle("color");
        let alpha = handle("alpha");
        loader.manager.begin(2);
        loader.register("color", color.clone(), true);
        loader.register("alpha", alpha.clone(), true);

        resolve(&loader, "color", Ok(RgbaImage::new(2, 2)));
        resolve(&loader, "alpha", Err(anyhow::anyhow!("404")));
        assert!(loader.poll());

        assert!(color.lock().unwrap().is_loaded());
        assert!(!alpha.lock().unwrap().is_loaded());
        assert!(loader.manager.is_complete());
        assert_eq!(loader.manager.progress().failed, 1);
    }

    #[test]
    fn untracked_loads_bypass_the_manager() {
        let mut loader = TextureLoader::new(LoadingManager::new());
        let manual = handle("manual");
        loader.register("manual", manual.clone(), false);

        resolve(&loader, "manual", Ok(RgbaImage::new(1, 1)));
        assert!(loader.poll());
        assert!(manual.lock().unwrap().is_loaded());
        assert!(!loader.manager.is_complete());
        assert_eq!(loader.manager.progress().total(), 0);
    }
}
