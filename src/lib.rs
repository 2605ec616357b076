//! Windowed traffic statistics over captured frames.
//!
//! Frames come from a pcap / pcapng file ([`iter`]) or a live interface
//! (`live` feature), are dissected into protocol [`Layer`]s ([`frame`]) and
//! classified through [`Classify`]. [`Windows`] cuts the stream into fixed
//! periods and yields one [`Snapshot`] per period, gaps included, which
//! [`export`] writes out as CSV rows.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Formatter;

pub mod classify;
pub mod config;
pub mod counter;
pub mod error;
pub mod export;
pub mod frame;
pub mod iter;
#[cfg(feature = "live")]
pub mod live;
pub mod windows;

pub use classify::*;
pub use config::{Config, Period};
pub use counter::{IpCount, Snapshot, TcpCount, WindowCount};
pub use error::{Error, FrameIssue, Result};
pub use frame::*;
pub use iter::{open, Pcap, PcapNG, Source};
pub use windows::{windows, Windows, WindowsExt};

pub use layer_derive::*;

pub fn default<T: Default>() -> T {
    Default::default()
}

/// A dissected protocol header, stored by type name in its parent's [`Layers`].
pub trait Layer: Any {
    fn name() -> &'static str where Self: Sized;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Default, derive_more::Deref, derive_more::DerefMut)]
pub struct Layers(HashMap<&'static str, Box<dyn Layer>>);

impl Layers {
    pub fn insert<T: Layer>(&mut self, layer: T) {
        self.0.insert(T::name(), Box::new(layer));
    }
}

impl std::fmt::Debug for Layers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names = self.0.keys().collect::<Vec<_>>();
        names.sort();
        write!(f, "{:?}", names)
    }
}

pub trait HasLayers {
    fn layers(&self) -> &Layers;
    fn get_layer_descendants<T>(&self) -> Option<&T> where T: Layer { None }
}

pub trait GetLayers {
    fn get_layer<T>(&self) -> Option<&T> where T: Layer;
}

impl<L: Layer + HasLayers> GetLayers for L {
    fn get_layer<T>(&self) -> Option<&T> where T: Layer {
        get_layer(self).or_else(|| self.get_layer_descendants::<T>())
    }
}

/// Direct child lookup, no descent.
pub fn get_layer<O, T>(origin: &O) -> Option<&T>
    where
        O: HasLayers,
        T: Layer
{
    origin.layers()
        .get(T::name())
        .and_then(|layer| layer.as_any().downcast_ref::<T>())
}
