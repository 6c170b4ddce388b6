// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Drawable-to-rendering-buffer cache.
//!
//! Presentation targets (windows) are identified by a window-system drawable
//! id. Registering a drawable with the windowing protocol costs a round trip,
//! so the first reference to an id goes through the protocol backend and the
//! binding is cached; later references are served from the cache. Bindings
//! die either individually, when the backend detects the drawable is gone, or
//! in bulk when the owning display closes.

use std::collections::HashMap;

use crate::status::VaError;
use crate::status::VaResult;
use crate::DrawableId;
use crate::Rectangle;

/// Which buffer of a drawable a [`RenderBuffer`] describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Attachment {
    Front,
    Back,
}

/// Driver-format metadata of one rendering buffer. This is a handle plus
/// layout, never pixel data.
#[derive(Copy, Clone, Debug)]
pub struct RenderBuffer {
    pub attachment: Attachment,
    pub name: u32,
    pub pitch: u32,
    pub cpp: u32,
    pub flags: u32,
}

/// Reply to a buffer query: the current buffers and the drawable's geometry
/// at the time of the query.
#[derive(Clone, Debug, Default)]
pub struct BufferReply {
    pub buffers: Vec<RenderBuffer>,
    pub width: u16,
    pub height: u16,
}

/// The windowing-protocol side of drawable management.
///
/// One implementation per protocol; all methods may issue protocol requests.
pub trait DrawableBackend: Send {
    /// Registers `drawable` with the protocol.
    fn create_drawable(&mut self, drawable: DrawableId) -> VaResult<()>;

    /// Unregisters `drawable`. Best-effort: some protocols cannot confirm.
    fn destroy_drawable(&mut self, drawable: DrawableId);

    /// Whether `drawable` refers to an on-screen window (as opposed to an
    /// offscreen pixmap).
    fn is_window(&mut self, drawable: DrawableId) -> bool;

    /// The current buffers of `drawable` for the requested attachments.
    fn query_buffers(
        &mut self,
        drawable: DrawableId,
        attachments: &[Attachment],
    ) -> VaResult<BufferReply>;

    /// Whether the protocol offers an atomic swap request.
    fn swap_available(&self) -> bool;

    /// Atomic back-to-front swap. Returns a frame counter.
    fn swap_buffers(&mut self, drawable: DrawableId) -> VaResult<u64>;

    /// Fallback presentation: copy `region` from the back to the front
    /// buffer.
    fn copy_region(&mut self, drawable: DrawableId, region: Rectangle) -> VaResult<()>;
}

/// Cached per-drawable state.
#[derive(Debug)]
pub struct DrawableEntry {
    pub drawable: DrawableId,
    pub is_window: bool,
    pub width: u16,
    pub height: u16,
    pub has_backbuffer: bool,
}

/// The cache itself: one per display connection that has drawables.
pub struct DrawableCache {
    backend: Box<dyn DrawableBackend>,
    entries: HashMap<DrawableId, DrawableEntry>,
}

impl DrawableCache {
    pub fn new(backend: Box<dyn DrawableBackend>) -> DrawableCache {
        DrawableCache {
            backend,
            entries: HashMap::new(),
        }
    }

    /// Returns the binding for `drawable`, registering it with the protocol
    /// on first reference. At most one binding ever exists per id.
    pub fn lookup_or_create(&mut self, drawable: DrawableId) -> VaResult<&mut DrawableEntry> {
        // Entry API would borrow the map across the backend calls, so do the
        // lookup by hand.
        if !self.entries.contains_key(&drawable) {
            self.backend.create_drawable(drawable)?;
            let is_window = self.backend.is_window(drawable);
            self.entries.insert(
                drawable,
                DrawableEntry {
                    drawable,
                    is_window,
                    width: 0,
                    height: 0,
                    has_backbuffer: false,
                },
            );
        }

        Ok(self
            .entries
            .get_mut(&drawable)
            .expect("binding inserted above"))
    }

    /// Drops a single binding. Called by protocol integrations when an error
    /// trap reveals the drawable no longer exists.
    pub fn evict(&mut self, drawable: DrawableId) {
        if self.entries.remove(&drawable).is_some() {
            self.backend.destroy_drawable(drawable);
        }
    }

    /// Drops every binding; used when the owning display closes.
    pub fn clear(&mut self) {
        for (drawable, _) in self.entries.drain() {
            self.backend.destroy_drawable(drawable);
        }
    }

    /// Resolves the buffer to render into: the back buffer when the drawable
    /// has a true one, the front buffer otherwise. Refreshes the cached
    /// geometry as a side effect.
    pub fn rendering_buffer(&mut self, drawable: DrawableId) -> VaResult<RenderBuffer> {
        let entry = self.lookup_or_create(drawable)?;
        let wanted = if entry.is_window {
            Attachment::Back
        } else {
            Attachment::Front
        };
        let drawable_id = entry.drawable;

        let reply = self.backend.query_buffers(drawable_id, &[wanted])?;

        let back = reply
            .buffers
            .iter()
            .find(|b| b.attachment == Attachment::Back)
            .copied();
        let front = reply
            .buffers
            .iter()
            .find(|b| b.attachment == Attachment::Front)
            .copied();

        let entry = self
            .entries
            .get_mut(&drawable_id)
            .expect("binding created above");
        entry.width = reply.width;
        entry.height = reply.height;
        entry.has_backbuffer = back.is_some();

        back.or(front).ok_or(VaError::OperationFailed)
    }

    /// Presents the back buffer. A no-op for drawables without one. Uses the
    /// protocol's atomic swap when available, otherwise a copy of a damage
    /// region covering the whole drawable.
    pub fn swap_buffer(&mut self, drawable: DrawableId) -> VaResult<()> {
        let Some(entry) = self.entries.get(&drawable) else {
            return Ok(());
        };
        if !entry.has_backbuffer {
            return Ok(());
        }

        if self.backend.swap_available() {
            self.backend.swap_buffers(drawable).map(|_| ())
        } else {
            let region = Rectangle {
                x: 0,
                y: 0,
                width: entry.width,
                height: entry.height,
            };
            self.backend.copy_region(drawable, region)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
