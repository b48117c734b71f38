// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Update package configuration
//!
//! The image builder is driven by a small line oriented document: a comment
//! banner, a `[root]` block describing the package and the device it is for,
//! and an `[images]` block listing one image file per selected component.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::fs;

use crate::cable::{CableType, VENDOR_ID};
use crate::error::ConfigurationError;

/// Compatibility version written to every package; the cable firmware accepts
/// only this value.
pub const COMPATIBILITY_VERSION: u32 = 0x0000_0001;

/// Upper bound on the number of images in a generated package.
pub const MAX_IMAGES: usize = 10;

/// The categories of image a package can carry. Each one has a directory of
/// candidate images under the DFU directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FirmwareComponent {
    BootLoader,
    Dfu,
    ComProcessor,
    AcqProcessor,
}

impl FirmwareComponent {
    pub const ALL: [FirmwareComponent; 4] = [
        FirmwareComponent::BootLoader,
        FirmwareComponent::Dfu,
        FirmwareComponent::ComProcessor,
        FirmwareComponent::AcqProcessor,
    ];

    /// Directory name under the DFU directory, also used as the image key.
    pub fn name(&self) -> &'static str {
        match self {
            FirmwareComponent::BootLoader => "BootLoader",
            FirmwareComponent::Dfu => "DFU",
            FirmwareComponent::ComProcessor => "COMProcessor",
            FirmwareComponent::AcqProcessor => "ACQProcessor",
        }
    }
}

impl fmt::Display for FirmwareComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the `[images]` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub component: FirmwareComponent,
    pub path: PathBuf,
}

/// A fully resolved package configuration, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePackageConfig {
    generated_at: DateTime<Utc>,
    package_version: u32,
    vendor_id: u16,
    product_id: u16,
    images: Vec<ImageEntry>,
}

impl UpdatePackageConfig {
    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    pub fn package_version(&self) -> u32 {
        self.package_version
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    /// Renders the document consumed by the image builder.
    ///
    /// Images keep their selection order and are numbered from 1.
    pub fn render(&self) -> String {
        let mut doc = String::new();

        doc.push_str("# Active cable DFU package configuration\n");
        doc.push_str(&format!(
            "# generated {}\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        doc.push_str("[root]\n");
        doc.push_str(&format!(
            "package_version = 0x{:08x}\n",
            self.package_version
        ));
        doc.push_str(&format!(
            "compatibility_version = 0x{:08x}\n",
            COMPATIBILITY_VERSION
        ));
        doc.push_str(&format!("vendor_id = 0x{:04x}\n", self.vendor_id));
        doc.push_str(&format!("product_id = 0x{:04x}\n", self.product_id));

        doc.push('\n');

        doc.push_str("[images]\n");
        for (idx, image) in self.images.iter().enumerate() {
            doc.push_str(&format!(
                "{}_{} = {}\n",
                idx + 1,
                image.component,
                image.path.display()
            ));
        }

        doc
    }
}

/// Resolves component selections against the image tree under a DFU
/// directory (`<dfu_directory>/<component>/<image files>`).
pub struct UpdatePackageConfigBuilder {
    dfu_directory: PathBuf,
    package_version: u32,
}

impl UpdatePackageConfigBuilder {
    pub fn new<P: AsRef<Path>>(dfu_directory: P, package_version: u32) -> Self {
        UpdatePackageConfigBuilder {
            dfu_directory: dfu_directory.as_ref().to_owned(),
            package_version,
        }
    }

    /// Builds a configuration from a random selection of 1 to 10 components,
    /// repeats allowed, each resolved to a random image file.
    pub async fn build<R: Rng + ?Sized>(
        &self,
        cable: CableType,
        rng: &mut R,
    ) -> Result<UpdatePackageConfig, ConfigurationError> {
        let selection = select_components(rng);
        self.build_from_selection(cable, &selection, rng).await
    }

    /// Builds a configuration for an explicit component selection.
    pub async fn build_from_selection<R: Rng + ?Sized>(
        &self,
        cable: CableType,
        selection: &[FirmwareComponent],
        rng: &mut R,
    ) -> Result<UpdatePackageConfig, ConfigurationError> {
        let mut images = Vec::with_capacity(selection.len());
        for &component in selection {
            let candidates = self.list_images(component).await?;
            let path = candidates.choose(rng).cloned().ok_or_else(|| {
                ConfigurationError::NoComponentImages {
                    component,
                    path: self.component_directory(component),
                }
            })?;

            images.push(ImageEntry { component, path });
        }

        Ok(UpdatePackageConfig {
            generated_at: Utc::now(),
            package_version: self.package_version,
            vendor_id: VENDOR_ID,
            product_id: cable.product_id(),
            images,
        })
    }

    fn component_directory(&self, component: FirmwareComponent) -> PathBuf {
        self.dfu_directory.join(component.name())
    }

    /// Regular files directly under the component directory, sorted so the
    /// random pick depends only on the random source.
    async fn list_images(
        &self,
        component: FirmwareComponent,
    ) -> Result<Vec<PathBuf>, ConfigurationError> {
        let dir = self.component_directory(component);
        let missing = |_: io::Error| ConfigurationError::MissingComponentDirectory {
            component,
            path: dir.clone(),
        };

        let mut entries = fs::read_dir(&dir).await.map_err(missing)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(missing)? {
            let path = entry.path();
            if fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
                files.push(path);
            }
        }
        files.sort();

        Ok(files)
    }
}

/// A non-empty random selection of components, repeats allowed.
pub fn select_components<R: Rng + ?Sized>(rng: &mut R) -> Vec<FirmwareComponent> {
    let count = rng.gen_range(1..=MAX_IMAGES);
    (0..count)
        .filter_map(|_| FirmwareComponent::ALL.choose(rng).copied())
        .collect()
}
