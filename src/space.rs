/// Storage checks for downloads
///
/// Classifies each book by whether the device has room for it. The result is
/// display-only: it picks the accessory color and the action taken when the
/// user taps the download button, never the list order.

use std::path::Path;

use sysinfo::Disks;

use crate::state::data::{Book, SpaceState};

/// Decides whether a book fits in the available storage
pub trait SpacePolicy {
    fn space_state(&self, book: &Book, available_bytes: u64) -> SpaceState;
}

/// Enough while the book takes less than `caution_ratio` of the free space,
/// Caution while it still fits, NotEnough otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeSpaceMargin {
    pub caution_ratio: f64,
}

impl Default for FreeSpaceMargin {
    fn default() -> Self {
        Self { caution_ratio: 0.8 }
    }
}

impl SpacePolicy for FreeSpaceMargin {
    fn space_state(&self, book: &Book, available_bytes: u64) -> SpaceState {
        let size = book.file_size as f64;
        let available = available_bytes as f64;
        if size < available * self.caution_ratio {
            SpaceState::Enough
        } else if book.file_size < available_bytes {
            SpaceState::Caution
        } else {
            SpaceState::NotEnough
        }
    }
}

/// Free bytes on the disk holding `path` (the mount point with the longest
/// matching prefix). None if no disk matches.
pub fn available_space(path: &Path) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}
