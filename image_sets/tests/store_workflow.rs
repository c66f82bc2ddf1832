// tests/store_workflow.rs
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use image_sets::catalog;
use image_sets::crypto::{derive_key, open};
use image_sets::{
    encrypt_folder, CatalogStatus, EncryptedSet, ExtensionAllowList, FixedPassword,
    ImageSetError, Protection, SetStore, StoreConfig,
};
use secrecy::SecretString;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    photos: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let root = dir.path().join("images");
        let photos = dir.path().join("photos");
        std::fs::create_dir(&photos).unwrap();
        Self { _dir: dir, root, photos }
    }

    /// Create a source folder with the given (name, bytes) files
    fn source(&self, folder: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let dir = self.photos.join(folder);
        std::fs::create_dir_all(&dir).unwrap();
        for (name, bytes) in files {
            std::fs::write(dir.join(name), bytes).unwrap();
        }
        dir
    }

    fn store(&self) -> SetStore {
        SetStore::new(StoreConfig::new(&self.root))
            .with_prompt(Box::new(FixedPassword::new("hunter2")))
    }

    fn catalog_json(&self) -> Value {
        serde_json::from_slice(&std::fs::read(self.root.join("manifest.json")).unwrap()).unwrap()
    }
}

fn password(p: &str) -> SecretString {
    SecretString::from(p.to_string())
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[test]
fn test_add_plain_set() {
    let fx = Fixture::new();
    let cats = fx.source(
        "cats",
        &[("c.jpg", b"ccc"), ("a.jpg", b"aaa"), ("b.jpg", b"bbb"), ("readme.txt", b"skip")],
    );

    let added = fx.store().add(&cats, "Cats", Protection::Plain).unwrap();

    assert_eq!(added.summary.id, "cats");
    assert_eq!(added.summary.name, "Cats");
    assert!(!added.summary.encrypted);
    assert_eq!(added.summary.image_count, 3);
    assert_eq!(added.catalog, CatalogStatus::Updated { default_set: Some("cats".into()) });

    let set = fx.root.join("cats");
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        assert!(set.join(name).exists(), "{} not copied", name);
    }
    assert!(!set.join("readme.txt").exists());
    assert!(!set.join("manifest.json").exists());
    assert_eq!(read_json(&set.join("images.json")), serde_json::json!(["a.jpg", "b.jpg", "c.jpg"]));
    assert_eq!(std::fs::read(set.join("b.jpg")).unwrap(), b"bbb");

    let catalog = fx.catalog_json();
    assert_eq!(
        catalog["sets"],
        serde_json::json!([{ "id": "cats", "name": "Cats", "path": "cats/", "encrypted": false }])
    );
    assert_eq!(catalog["defaultSet"], "cats");
}

#[test]
fn test_add_encrypted_set_preserves_order() {
    let fx = Fixture::new();
    let private = fx.source(
        "private",
        &[("b.png", b"second image"), ("a.jpg", b"first image"), ("c.gif", b"third image")],
    );

    let added = fx
        .store()
        .add(&private, "Yz", Protection::Encrypted { password: Some(password("hunter2")) })
        .unwrap();

    assert_eq!(added.summary.id, "yz");
    assert_eq!(added.summary.name, "Yz");
    assert!(added.summary.encrypted);
    assert_eq!(added.summary.image_count, 3);

    let set = fx.root.join("yz");
    for name in ["0.enc", "1.enc", "2.enc", "manifest.json"] {
        assert!(set.join(name).exists(), "missing {}", name);
    }
    assert!(!set.join("a.jpg").exists());
    assert!(!set.join("images.json").exists());

    let manifest = read_json(&set.join("manifest.json"));
    assert_eq!(manifest["encrypted"], true);
    assert_eq!(manifest["name"], "Yz");

    // Decrypt the way a viewer would: only the manifest fields and the .enc files
    let salt: [u8; 16] = STANDARD
        .decode(manifest["salt"].as_str().unwrap())
        .unwrap()
        .try_into()
        .unwrap();
    let key = derive_key(&password("hunter2"), &salt).unwrap();

    let mut list_blob = STANDARD.decode(manifest["iv"].as_str().unwrap()).unwrap();
    list_blob.extend(STANDARD.decode(manifest["images"].as_str().unwrap()).unwrap());
    let names: Vec<String> = serde_json::from_slice(&open(&list_blob, &key).unwrap()).unwrap();
    assert_eq!(names, vec!["a.jpg", "b.png", "c.gif"]);

    let expected: [&[u8]; 3] = [b"first image", b"second image", b"third image"];
    for (i, bytes) in expected.iter().enumerate() {
        let blob = std::fs::read(set.join(format!("{}.enc", i))).unwrap();
        assert_eq!(open(&blob, &key).unwrap(), *bytes);
    }

    let catalog = fx.catalog_json();
    assert_eq!(catalog["sets"][0]["encrypted"], true);
    assert_eq!(catalog["defaultSet"], "yz");
}

#[test]
fn test_wrong_password_is_authentication_error() {
    let fx = Fixture::new();
    let private = fx.source("private", &[("a.jpg", b"secret")]);

    fx.store()
        .add(&private, "Yz", Protection::Encrypted { password: Some(password("hunter2")) })
        .unwrap();

    let set = EncryptedSet::open(&fx.root.join("yz")).unwrap();
    assert!(matches!(set.filenames(&password("hunter3")), Err(ImageSetError::Authentication)));
    assert!(matches!(set.image(&password("hunter3"), 0), Err(ImageSetError::Authentication)));
    assert_eq!(set.image(&password("hunter2"), 0).unwrap(), b"secret");
}

#[test]
fn test_prompted_password_is_used() {
    let fx = Fixture::new();
    let private = fx.source("private", &[("a.jpg", b"prompted")]);

    fx.store()
        .add(&private, "Yz", Protection::Encrypted { password: None })
        .unwrap();

    let set = EncryptedSet::open(&fx.root.join("yz")).unwrap();
    assert_eq!(set.filenames(&password("hunter2")).unwrap(), vec!["a.jpg"]);
}

#[test]
fn test_remove_restores_default() {
    let fx = Fixture::new();
    let store = fx.store();
    let cats = fx.source("cats", &[("a.jpg", b"a")]);
    let private = fx.source("private", &[("x.png", b"x"), ("y.png", b"y")]);

    store
        .add(&private, "Yz", Protection::Encrypted { password: Some(password("hunter2")) })
        .unwrap();
    store.add(&cats, "Cats", Protection::Plain).unwrap();
    assert_eq!(fx.catalog_json()["defaultSet"], "cats");

    let status = store.remove("yz").unwrap();
    assert_eq!(status, CatalogStatus::Updated { default_set: Some("cats".into()) });
    assert!(!fx.root.join("yz").exists());
    assert_eq!(fx.catalog_json()["sets"].as_array().unwrap().len(), 1);

    let status = store.remove("cats").unwrap();
    assert_eq!(status, CatalogStatus::Updated { default_set: None });
    assert!(!fx.root.join("manifest.json").exists());
}

#[test]
fn test_default_set_policy_across_store() {
    let fx = Fixture::new();
    let store = fx.store();
    let src = fx.source("src", &[("a.jpg", b"a")]);
    let enc = || Protection::Encrypted { password: Some(password("pw")) };

    store.add(&src, "A", enc()).unwrap();
    store.add(&src, "C", enc()).unwrap();
    assert_eq!(fx.catalog_json()["defaultSet"], "a");

    store.add(&src, "B", Protection::Plain).unwrap();
    let catalog = fx.catalog_json();
    assert_eq!(catalog["defaultSet"], "b");
    let ids: Vec<_> = catalog["sets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_empty_source_creates_nothing() {
    let fx = Fixture::new();
    let empty = fx.source("empty", &[("notes.txt", b"no images here")]);

    let result = fx.store().add(&empty, "Empty", Protection::Plain);

    assert!(matches!(result, Err(ImageSetError::EmptySet(_))));
    assert!(!fx.root.join("empty").exists());
}

#[test]
fn test_duplicate_set_is_rejected() {
    let fx = Fixture::new();
    let store = fx.store();
    let cats = fx.source("cats", &[("a.jpg", b"a")]);

    store.add(&cats, "Cats", Protection::Plain).unwrap();
    let result = store.add(&cats, "cats", Protection::Plain);

    assert!(matches!(result, Err(ImageSetError::DuplicateSet(id)) if id == "cats"));
}

#[test]
fn test_failed_encryption_leaves_no_directory() {
    let fx = Fixture::new();
    let store = fx.store();
    let src = fx.source("src", &[("a.jpg", b"a"), ("b.jpg", b"b")]);

    // One listed source vanishes before it can be read
    let paths = vec![src.join("a.jpg"), src.join("gone.jpg"), src.join("b.jpg")];
    let result = store.add_files(
        &paths,
        "Broken",
        Protection::Encrypted { password: Some(password("pw")) },
    );

    assert!(matches!(result, Err(ImageSetError::Filesystem(_))));
    assert!(!fx.root.join("broken").exists());
}

#[test]
fn test_password_mismatch_writes_nothing() {
    struct Mismatch;
    impl image_sets::PasswordPrompt for Mismatch {
        fn read_password(&self, prompt: &str) -> image_sets::ImageSetResult<SecretString> {
            Ok(password(if prompt.starts_with("Confirm") { "two" } else { "one" }))
        }
    }

    let fx = Fixture::new();
    let src = fx.source("src", &[("a.jpg", b"a")]);
    let store = SetStore::new(StoreConfig::new(&fx.root)).with_prompt(Box::new(Mismatch));

    let result = store.add(&src, "Yz", Protection::Encrypted { password: None });

    assert!(matches!(result, Err(ImageSetError::PasswordMismatch)));
    assert!(!fx.root.join("yz").exists());
}

#[test]
fn test_add_files_keeps_given_order() {
    let fx = Fixture::new();
    let src = fx.source("src", &[("z.jpg", b"z"), ("m.png", b"m"), ("a.txt", b"t")]);

    let paths = vec![src.join("z.jpg"), src.join("a.txt"), src.join("m.png")];
    let added = fx.store().add_files(&paths, "Mixed Bag", Protection::Plain).unwrap();

    assert_eq!(added.summary.id, "mixed-bag");
    assert_eq!(added.summary.name, "Mixed-bag");
    assert_eq!(
        read_json(&fx.root.join("mixed-bag").join("images.json")),
        serde_json::json!(["z.jpg", "m.png"])
    );
}

#[test]
fn test_list_and_get() {
    let fx = Fixture::new();
    let store = fx.store();
    assert!(store.list().unwrap().is_empty());

    let cats = fx.source("cats", &[("a.jpg", b"a"), ("b.JPG", b"b")]);
    let private = fx.source("private", &[("x.png", b"x")]);
    store.add(&cats, "Cats", Protection::Plain).unwrap();
    store
        .add(&private, "Top Secret", Protection::Encrypted { password: Some(password("pw")) })
        .unwrap();

    let sets = store.list().unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!((sets[0].id.as_str(), sets[0].name.as_str()), ("cats", "Cats"));
    assert_eq!(sets[0].image_count, 2);
    assert!(!sets[0].encrypted);
    assert_eq!((sets[1].id.as_str(), sets[1].name.as_str()), ("top-secret", "Top Secret"));
    assert_eq!(sets[1].image_count, 1);
    assert!(sets[1].encrypted);

    assert_eq!(store.get("top-secret").unwrap(), sets[1]);
    assert!(matches!(store.get("dogs"), Err(ImageSetError::SetNotFound(_))));
    assert!(matches!(store.remove("dogs"), Err(ImageSetError::SetNotFound(_))));
    assert!(matches!(store.remove(".."), Err(ImageSetError::InvalidSetName(_))));
}

#[test]
fn test_refresh_rebuilds_plain_lists() {
    let fx = Fixture::new();
    let store = fx.store();
    let cats = fx.source("cats", &[("a.jpg", b"a")]);
    store.add(&cats, "Cats", Protection::Plain).unwrap();

    // Hand-dropped files and a hand-made set directory
    std::fs::write(fx.root.join("cats").join("b.webp"), b"b").unwrap();
    let dogs = fx.root.join("dogs");
    std::fs::create_dir(&dogs).unwrap();
    std::fs::write(dogs.join("rex.heic"), b"r").unwrap();

    let report = store.refresh().unwrap();

    assert_eq!(report.sets.len(), 2);
    assert_eq!(report.sets[0].image_count, 2);
    assert_eq!(report.sets[1].name, "Dogs");
    assert_eq!(
        read_json(&fx.root.join("cats").join("images.json")),
        serde_json::json!(["a.jpg", "b.webp"])
    );
    assert_eq!(read_json(&dogs.join("images.json")), serde_json::json!(["rex.heic"]));
    assert_eq!(report.catalog.unwrap().default_set.as_deref(), Some("cats"));
}

#[test]
fn test_regenerate_is_byte_identical() {
    let fx = Fixture::new();
    let store = fx.store();
    let src = fx.source("src", &[("a.jpg", b"a")]);
    store.add(&src, "One", Protection::Plain).unwrap();
    store
        .add(&src, "Two", Protection::Encrypted { password: Some(password("pw")) })
        .unwrap();

    let before = std::fs::read(fx.root.join("manifest.json")).unwrap();
    catalog::regenerate(&fx.root).unwrap();
    let after = std::fs::read(fx.root.join("manifest.json")).unwrap();

    assert_eq!(before, after);
}

#[test]
fn test_catalog_failure_is_reported_as_stale() {
    let fx = Fixture::new();
    let store = fx.store();
    let src = fx.source("src", &[("a.jpg", b"a")]);
    store.add(&src, "Good", Protection::Plain).unwrap();

    // A set whose metadata cannot be parsed breaks the rebuild, not the add
    let broken = fx.root.join("broken");
    std::fs::create_dir(&broken).unwrap();
    std::fs::write(broken.join("manifest.json"), b"{oops").unwrap();

    let added = store.add(&src, "Other", Protection::Plain).unwrap();

    assert!(added.catalog.is_stale());
    assert!(fx.root.join("other").join("images.json").exists());
}

#[test]
fn test_export_decrypts_set() {
    let fx = Fixture::new();
    let store = fx.store();
    let private = fx.source("private", &[("b.png", b"bee"), ("a.jpg", b"ay")]);
    store
        .add(&private, "Yz", Protection::Encrypted { password: Some(password("hunter2")) })
        .unwrap();

    let out = fx.photos.join("restored");
    let names = store.export("yz", &out, None).unwrap();

    assert_eq!(names, vec!["a.jpg", "b.png"]);
    assert_eq!(std::fs::read(out.join("a.jpg")).unwrap(), b"ay");
    assert_eq!(std::fs::read(out.join("b.png")).unwrap(), b"bee");

    let result = store.export("yz", &out, Some(password("wrong")));
    assert!(matches!(result, Err(ImageSetError::Authentication)));

    let cats = fx.source("cats", &[("a.jpg", b"a")]);
    store.add(&cats, "Cats", Protection::Plain).unwrap();
    assert!(matches!(
        store.export("cats", &out, None),
        Err(ImageSetError::SetNotEncrypted(_))
    ));
}

#[test]
fn test_encrypt_folder_standalone() {
    let fx = Fixture::new();
    let src = fx.source("src", &[("a.jpg", b"a"), ("b.jpg", b"b")]);
    let out = fx.photos.join("out").join("cats");
    let extensions = ExtensionAllowList::default();

    let count = encrypt_folder(&src, &out, "Cats", password("pw"), &extensions).unwrap();

    assert_eq!(count, 2);
    assert!(out.join("0.enc").exists());
    assert!(out.join("1.enc").exists());
    assert!(!fx.root.exists(), "standalone encryption must not touch the images root");

    let set = EncryptedSet::open(&out).unwrap();
    assert_eq!(set.name(), "Cats");
    assert_eq!(set.filenames(&password("pw")).unwrap(), vec!["a.jpg", "b.jpg"]);

    let again = encrypt_folder(&src, &out, "Cats", password("pw"), &extensions);
    assert!(matches!(again, Err(ImageSetError::DuplicateSet(_))));

    let empty = encrypt_folder(&src, &out, "Cats", password(""), &extensions);
    assert!(matches!(empty, Err(ImageSetError::EmptyPassword)));
}

#[cfg(unix)]
#[test]
fn test_dangling_link_in_root_is_ignored() {
    let fx = Fixture::new();
    let store = fx.store();
    std::fs::create_dir_all(&fx.root).unwrap();
    std::os::unix::fs::symlink("/nonexistent/dir", fx.root.join("stale-link")).unwrap();

    let cats = fx.source("cats", &[("a.jpg", b"a")]);
    let added = store.add(&cats, "Cats", Protection::Plain).unwrap();

    assert_eq!(added.catalog, CatalogStatus::Updated { default_set: Some("cats".into()) });
    assert_eq!(fx.catalog_json()["sets"].as_array().unwrap().len(), 1);
    assert_eq!(store.list().unwrap().len(), 1);
    assert!(catalog::regenerate(&fx.root).unwrap().is_some());
}

#[cfg(target_os = "linux")]
#[test]
fn test_encrypt_folder_failure_in_existing_output_leaves_no_sealed_files() {
    let fx = Fixture::new();
    let src = fx.source("src", &[("a.jpg", b"a")]);
    // Lists as a regular file but every read fails with EIO
    std::os::unix::fs::symlink("/proc/self/mem", src.join("b.jpg")).unwrap();

    let out = fx.photos.join("out");
    std::fs::create_dir(&out).unwrap();
    std::fs::write(out.join("notes.txt"), b"kept").unwrap();

    let result = encrypt_folder(&src, &out, "Cats", password("pw"), &ExtensionAllowList::default());

    assert!(matches!(result, Err(ImageSetError::Filesystem(_))));
    let left: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(left, vec!["notes.txt"]);
}
