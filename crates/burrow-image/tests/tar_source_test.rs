//! Preparing a root from a local archive through the public source API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use burrow_common::config::RegistryConfig;
use burrow_common::types::ContainerRoot;
use burrow_image::source::{ImageSource, resolve_source};

fn write_rootfs_tar(path: &Path) {
    let file = std::fs::File::create(path).expect("create archive");
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in [("bin/sh", "#!stub\n"), ("etc/hostname", "image\n")] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data.as_bytes())
            .expect("append");
    }
    let encoder = builder.into_inner().expect("finish tar");
    let _ = encoder.finish().expect("finish gzip");
}

#[test]
fn tar_source_populates_new_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let archive = dir.path().join("rootfs.tar.gz");
    write_rootfs_tar(&archive);
    let root = ContainerRoot::new(dir.path().join("rootfs")).expect("root");

    let source = resolve_source(&format!("tar://{}", archive.display())).expect("resolve");
    assert!(matches!(source, ImageSource::Tar(_)));
    let prepared = source
        .prepare(&root, &RegistryConfig::default())
        .expect("prepare");

    assert_eq!(prepared.root, root);
    assert!(prepared.config.is_none());
    assert_eq!(
        std::fs::read_to_string(root.join("etc/hostname")).expect("read"),
        "image\n"
    );
    assert!(root.join("bin/sh").is_file());
}

#[test]
fn tar_source_overlays_existing_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let archive = dir.path().join("rootfs.tar.gz");
    write_rootfs_tar(&archive);
    let root = ContainerRoot::new(dir.path().join("rootfs")).expect("root");
    std::fs::create_dir_all(root.join("etc")).expect("mkdir");
    std::fs::write(root.join("etc/hostname"), "old\n").expect("seed");
    std::fs::write(root.join("etc/local"), "kept\n").expect("seed");

    let _ = ImageSource::Tar(archive)
        .prepare(&root, &RegistryConfig::default())
        .expect("prepare");

    assert_eq!(
        std::fs::read_to_string(root.join("etc/hostname")).expect("read"),
        "image\n"
    );
    assert!(root.join("etc/local").exists());
}
