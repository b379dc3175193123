use super::AssetError;
use crate::scene::PoiId;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Larger images are scaled down before upload.
const MAX_TEXTURE_SIDE: u32 = 2048;

type Loaded = (PoiId, Result<egui::ColorImage, AssetError>);

pub enum ImageSlot {
    Loading,
    Ready(egui::TextureHandle),
    Failed(String),
}

/// Artwork pictures for the detail overlay, fetched in the background the
/// first time each artwork is opened.
pub struct ArtworkImages {
    runtime: Handle,
    client: reqwest::Client,
    sender: UnboundedSender<Loaded>,
    receiver: UnboundedReceiver<Loaded>,
    slots: HashMap<PoiId, ImageSlot>,
}

impl ArtworkImages {
    pub fn new(runtime: Handle) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AssetError::ClientSetup(e.to_string()))?;
        let (sender, receiver) = mpsc::unbounded_channel();
        Ok(Self {
            runtime,
            client,
            sender,
            receiver,
            slots: HashMap::new(),
        })
    }

    pub fn slot(&self, poi: PoiId) -> Option<&ImageSlot> {
        self.slots.get(&poi)
    }

    /// Starts loading `reference` unless this artwork was requested before.
    /// Failed loads are retried on the next request.
    pub fn request(&mut self, poi: PoiId, reference: &str) {
        if matches!(
            self.slots.get(&poi),
            Some(ImageSlot::Loading | ImageSlot::Ready(_))
        ) {
            return;
        }
        self.slots.insert(poi, ImageSlot::Loading);

        let client = self.client.clone();
        let sender = self.sender.clone();
        let reference = reference.to_string();
        log::debug!("Loading image for artwork {}: {}", poi, reference);
        self.runtime.spawn(async move {
            let result = load(&client, reference).await;
            if sender.send((poi, result)).is_err() {
                log::debug!("Image for artwork {} arrived after shutdown", poi);
            }
        });
    }

    /// Uploads finished images as egui textures.
    pub fn receive(&mut self, ctx: &egui::Context) {
        while let Ok((poi, result)) = self.receiver.try_recv() {
            let slot = match result {
                Ok(image) => ImageSlot::Ready(ctx.load_texture(
                    format!("artwork-{}", poi),
                    image,
                    egui::TextureOptions::LINEAR,
                )),
                Err(err) => {
                    log::warn!("Artwork {} image unavailable: {}", poi, err);
                    ImageSlot::Failed(err.to_string())
                }
            };
            self.slots.insert(poi, slot);
        }
    }
}

async fn load(client: &reqwest::Client, reference: String) -> Result<egui::ColorImage, AssetError> {
    let fetch_error = |reason: String| AssetError::Fetch {
        reference: reference.clone(),
        reason,
    };

    let bytes = if reference.starts_with("http://") || reference.starts_with("https://") {
        let response = client
            .get(&reference)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }
        response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .to_vec()
    } else {
        let path = PathBuf::from(&reference);
        tokio::task::spawn_blocking(move || std::fs::read(path))
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .map_err(|e| fetch_error(e.to_string()))?
    };

    tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| fetch_error(e.to_string()))?
}

pub fn decode_image(bytes: &[u8]) -> Result<egui::ColorImage, AssetError> {
    let mut image = image::load_from_memory(bytes)?;
    if image.width() > MAX_TEXTURE_SIDE || image.height() > MAX_TEXTURE_SIDE {
        image = image.thumbnail(MAX_TEXTURE_SIDE, MAX_TEXTURE_SIDE);
    }
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}
