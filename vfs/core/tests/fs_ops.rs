use std::sync::Arc;

use inogen_core::{
    AccessMask, Credentials, FileType, Filesystem, ObjectHandle, OpenFlags, SetAttr, Timespec,
    VfsErrorKind, VfsNameBuf,
};
use inogen_mem::MemStore;
use pretty_assertions::assert_eq;

struct Fixture {
    store: Arc<MemStore>,
    fs: Filesystem,
    cred: Credentials,
    root: ObjectHandle,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemStore::default());
        let fs = Filesystem::with_store(store.clone());
        let root = fs.root().unwrap();
        Self {
            store,
            fs,
            cred: Credentials::root(),
            root,
        }
    }

    fn file_with(&self, name: &[u8], contents: &[u8]) -> ObjectHandle {
        let handle = self.fs.create(&self.cred, self.root, name, 0o644).unwrap();
        let session = self.fs.open(&self.cred, handle, OpenFlags::WRITE).unwrap();
        assert_eq!(session.write(0, contents).unwrap(), contents.len());
        self.fs.close(session).unwrap();
        handle
    }

    fn contents(&self, handle: ObjectHandle) -> Vec<u8> {
        let session = self.fs.open(&self.cred, handle, OpenFlags::READ).unwrap();
        let mut buf = vec![0; 256];
        let read = session.read_exact_at(0, &mut buf).unwrap();
        buf.truncate(read);
        buf
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert_eq!(self.store.live_refs(), 0, "live references leaked");
        }
    }
}

#[test]
fn open_at_creates_and_reports_it() {
    let t = Fixture::new();
    let flags = OpenFlags::READ | OpenFlags::WRITE | OpenFlags::CREATE;

    let first = t.fs.open_at(&t.cred, t.root, b"new", flags, 0o600).unwrap();
    assert!(first.created);
    assert_eq!(first.session.handle(), first.handle);
    first.session.write(0, b"hello").unwrap();
    t.fs.close(first.session).unwrap();

    let second = t.fs.open_at(&t.cred, t.root, b"new", flags, 0o600).unwrap();
    assert!(!second.created);
    assert_eq!(second.handle, first.handle);
    t.fs.close(second.session).unwrap();

    let err = t
        .fs
        .open_at(&t.cred, t.root, b"new", flags | OpenFlags::EXCL, 0o600)
        .unwrap_err();
    assert_eq!(err.kind(), VfsErrorKind::AlreadyExists);

    let err = t
        .fs
        .open_at(&t.cred, t.root, b"missing", OpenFlags::READ, 0o600)
        .unwrap_err();
    assert_eq!(err.kind(), VfsErrorKind::NotFound);
}

#[test]
fn open_checks_type_and_mode() {
    let t = Fixture::new();
    let file = t.file_with(b"f", b"");

    assert_eq!(
        t.fs.open(&t.cred, file, OpenFlags::READ | OpenFlags::DIRECTORY)
            .unwrap_err()
            .kind(),
        VfsErrorKind::NotDir
    );
    assert_eq!(
        t.fs.open(&t.cred, t.root, OpenFlags::WRITE).unwrap_err().kind(),
        VfsErrorKind::IsDir
    );

    let dir = t.fs.open_dir(&t.cred, t.root).unwrap();
    let mut buf = [0; 4];
    assert_eq!(dir.read(0, &mut buf).unwrap_err().kind(), VfsErrorKind::IsDir);
    t.fs.close_dir(dir).unwrap();

    let read_only = t.fs.open(&t.cred, file, OpenFlags::READ).unwrap();
    assert_eq!(
        read_only.write(0, b"x").unwrap_err().kind(),
        VfsErrorKind::BadHandle
    );
}

#[test]
fn open_truncates_writable_files() {
    let t = Fixture::new();
    let file = t.file_with(b"log", b"old contents");

    let session = t
        .fs
        .open(&t.cred, file, OpenFlags::WRITE | OpenFlags::TRUNC)
        .unwrap();
    assert_eq!(session.stat().unwrap().size, 0);
    t.fs.close(session).unwrap();
}

#[test]
fn permissions_gate_access_and_open() {
    let t = Fixture::new();
    let file = t.file_with(b"private", b"secret");
    let user = Credentials::new(1000, 1000);

    assert!(t.fs.access(&user, file, AccessMask::READ).is_ok());
    assert_eq!(
        t.fs.access(&user, file, AccessMask::WRITE).unwrap_err().kind(),
        VfsErrorKind::PermissionDenied
    );
    assert_eq!(
        t.fs.open(&user, file, OpenFlags::READ | OpenFlags::WRITE)
            .unwrap_err()
            .kind(),
        VfsErrorKind::PermissionDenied
    );

    t.fs.set_attributes(&t.cred, file, &SetAttr::default().perm(0o600))
        .unwrap();
    assert_eq!(
        t.fs.open(&user, file, OpenFlags::READ).unwrap_err().kind(),
        VfsErrorKind::PermissionDenied
    );
}

#[test]
fn append_sessions_write_at_the_end() {
    let t = Fixture::new();
    let file = t.file_with(b"journal", b"one;");

    let session = t
        .fs
        .open(&t.cred, file, OpenFlags::WRITE | OpenFlags::APPEND)
        .unwrap();
    session.write(0, b"two;").unwrap();
    session.write(0, b"three;").unwrap();
    t.fs.close(session).unwrap();

    assert_eq!(t.contents(file), b"one;two;three;");
}

#[test]
fn append_offsets_past_the_end_of_u64_are_rejected() {
    let t = Fixture::new();
    let file = t.file_with(b"log", b"x");

    let session = t
        .fs
        .open(&t.cred, file, OpenFlags::WRITE | OpenFlags::APPEND)
        .unwrap();
    let err = session.write(u64::MAX, b"y").unwrap_err();
    assert_eq!(err.kind(), VfsErrorKind::InvalidInput);
    t.fs.close(session).unwrap();

    assert_eq!(t.contents(file), b"x");
}

#[test]
fn zero_and_truncate_reshape_files() {
    let t = Fixture::new();
    let file = t.file_with(b"data", b"abcdefgh");

    let session = t.fs.open(&t.cred, file, OpenFlags::WRITE).unwrap();
    session.zero(2, 3).unwrap();
    t.fs.close(session).unwrap();
    assert_eq!(t.contents(file), b"ab\0\0\0fgh");

    t.fs.truncate(&t.cred, file, 4).unwrap();
    assert_eq!(t.contents(file), b"ab\0\0");
    t.fs.truncate(&t.cred, file, 6).unwrap();
    assert_eq!(t.fs.get_attributes(&t.cred, file).unwrap().size, 6);
    assert_eq!(
        t.fs.truncate(&t.cred, t.root, 0).unwrap_err().kind(),
        VfsErrorKind::IsDir
    );
}

#[test]
fn mkdir_rmdir_and_unlink_enforce_kinds() {
    let t = Fixture::new();
    let dir = t.fs.mkdir(&t.cred, t.root, b"dir", 0o755).unwrap();
    t.fs.create(&t.cred, dir, b"inner", 0o644).unwrap();

    assert_eq!(
        t.fs.mkdir(&t.cred, t.root, b"dir", 0o755).unwrap_err().kind(),
        VfsErrorKind::AlreadyExists
    );
    assert_eq!(
        t.fs.rmdir(&t.cred, t.root, b"dir").unwrap_err().kind(),
        VfsErrorKind::DirNotEmpty
    );
    assert_eq!(
        t.fs.unlink(&t.cred, t.root, b"dir").unwrap_err().kind(),
        VfsErrorKind::IsDir
    );
    assert_eq!(
        t.fs.rmdir(&t.cred, dir, b"inner").unwrap_err().kind(),
        VfsErrorKind::NotDir
    );

    t.fs.unlink(&t.cred, dir, b"inner").unwrap();
    t.fs.rmdir(&t.cred, t.root, b"dir").unwrap();
    assert_eq!(
        t.fs.get_attributes(&t.cred, dir).unwrap_err().kind(),
        VfsErrorKind::NotFound
    );
    assert_eq!(t.store.object_count(), 1);
}

#[test]
fn lookup_validates_parent_and_name() {
    let t = Fixture::new();
    let file = t.file_with(b"plain", b"");

    assert_eq!(
        t.fs.lookup(&t.cred, file, b"child").unwrap_err().kind(),
        VfsErrorKind::NotDir
    );
    assert_eq!(
        t.fs.lookup(&t.cred, t.root, b"a/b").unwrap_err().kind(),
        VfsErrorKind::InvalidInput
    );
    let long = vec![b'n'; 256];
    assert_eq!(
        t.fs.create(&t.cred, t.root, &long, 0o644).unwrap_err().kind(),
        VfsErrorKind::NameTooLong
    );

    let (dot, file_type) = t.fs.lookup(&t.cred, t.root, b".").unwrap();
    assert_eq!(dot, t.root);
    assert_eq!(file_type, FileType::Directory);
}

#[test]
fn lookup_at_uses_the_open_directory() {
    let t = Fixture::new();
    let dir = t.fs.mkdir(&t.cred, t.root, b"etc", 0o755).unwrap();
    let conf = t.fs.create(&t.cred, dir, b"conf", 0o644).unwrap();

    let session = t.fs.open_dir(&t.cred, dir).unwrap();
    assert_eq!(
        t.fs.lookup_at(&session, b"conf").unwrap(),
        (conf, FileType::RegularFile)
    );
    assert_eq!(t.fs.lookup_at(&session, b"..").unwrap().0, t.root);
    t.fs.close_dir(session).unwrap();
}

#[test]
fn rename_moves_without_changing_identity() {
    let t = Fixture::new();
    let src = t.fs.mkdir(&t.cred, t.root, b"src", 0o755).unwrap();
    let dst = t.fs.mkdir(&t.cred, t.root, b"dst", 0o755).unwrap();
    let file = t.fs.create(&t.cred, src, b"a", 0o644).unwrap();
    let victim = t.fs.create(&t.cred, dst, b"b", 0o644).unwrap();

    t.fs.rename(&t.cred, src, b"a", dst, b"b").unwrap();

    assert_eq!(
        t.fs.lookup(&t.cred, src, b"a").unwrap_err().kind(),
        VfsErrorKind::NotFound
    );
    assert_eq!(t.fs.lookup(&t.cred, dst, b"b").unwrap().0, file);
    assert!(t.fs.get_attributes(&t.cred, file).is_ok());
    assert_eq!(
        t.fs.get_attributes(&t.cred, victim).unwrap_err().kind(),
        VfsErrorKind::NotFound
    );

    assert_eq!(
        t.fs.rename(&t.cred, t.root, b"src", src, b"inside")
            .unwrap_err()
            .kind(),
        VfsErrorKind::InvalidInput
    );
}

#[test]
fn hard_links_share_the_object() {
    let t = Fixture::new();
    let file = t.file_with(b"orig", b"shared");

    t.fs.link(&t.cred, t.root, file, b"alias").unwrap();
    let (alias, _) = t.fs.lookup(&t.cred, t.root, b"alias").unwrap();
    assert_eq!(alias, file);
    assert_eq!(t.fs.get_attributes(&t.cred, file).unwrap().nlink, 2);

    t.fs.unlink(&t.cred, t.root, b"orig").unwrap();
    assert_eq!(t.contents(alias), b"shared");

    let dir = t.fs.mkdir(&t.cred, t.root, b"d", 0o755).unwrap();
    assert_eq!(
        t.fs.link(&t.cred, t.root, dir, b"dlink").unwrap_err().kind(),
        VfsErrorKind::IsDir
    );
}

#[test]
fn symlinks_store_their_target() {
    let t = Fixture::new();
    let link = t
        .fs
        .symlink(&t.cred, t.root, b"ln", b"../elsewhere")
        .unwrap();

    assert_eq!(t.fs.read_link(&t.cred, link).unwrap(), b"../elsewhere");
    let stat = t.fs.get_attributes(&t.cred, link).unwrap();
    assert_eq!(stat.file_type, FileType::Symlink);
    assert_eq!(stat.size, 12);

    assert_eq!(
        t.fs.read_link(&t.cred, t.root).unwrap_err().kind(),
        VfsErrorKind::InvalidInput
    );
}

#[test]
fn set_attributes_applies_only_masked_fields() {
    let t = Fixture::new();
    let file = t.file_with(b"f", b"12345");
    let before = t.fs.get_attributes(&t.cred, file).unwrap();

    let unchanged = t.fs.set_attributes(&t.cred, file, &SetAttr::default()).unwrap();
    assert_eq!(unchanged, before);

    let stamp = Timespec::new(1_000, 0);
    let after = t
        .fs
        .set_attributes(
            &t.cred,
            file,
            &SetAttr::default()
                .perm(0o600)
                .owner(42, 43)
                .times(stamp, stamp),
        )
        .unwrap();
    assert_eq!(after.perm, 0o600);
    assert_eq!((after.uid, after.gid), (42, 43));
    assert_eq!(after.mtime, stamp);
    assert_eq!(after.size, 5);
    assert_eq!(after.mode(), 0o100600);

    let user = Credentials::new(1000, 1000);
    assert_eq!(
        t.fs.set_attributes(&user, file, &SetAttr::default().perm(0o777))
            .unwrap_err()
            .kind(),
        VfsErrorKind::PermissionDenied
    );
}

#[test]
fn extended_attributes_round_the_namespace() {
    let t = Fixture::new();
    let file = t.file_with(b"tagged", b"");

    assert!(t.fs.list_xattrs(&t.cred, file).unwrap().is_empty());
    assert_eq!(
        t.fs.get_xattr(&t.cred, file, b"user.a").unwrap_err().kind(),
        VfsErrorKind::NotFound
    );

    t.fs.set_xattr(&t.cred, file, b"user.a", b"first value").unwrap();
    t.fs.set_xattr(&t.cred, file, b"user.b", b"2").unwrap();
    t.fs.set_xattr(&t.cred, file, b"user.a", b"1").unwrap();

    assert_eq!(t.fs.get_xattr(&t.cred, file, b"user.a").unwrap(), b"1");
    let mut names = t.fs.list_xattrs(&t.cred, file).unwrap();
    names.sort();
    assert_eq!(names, vec![VfsNameBuf::from("user.a"), VfsNameBuf::from("user.b")]);

    t.fs.remove_xattr(&t.cred, file, b"user.a").unwrap();
    let mut visited = Vec::new();
    t.fs.iterate_xattrs(&t.cred, file, |name| {
        visited.push(name.to_buf());
        Ok(())
    })
    .unwrap();
    assert_eq!(visited, vec![VfsNameBuf::from("user.b")]);
}

#[test]
fn statfs_tracks_usage() {
    let t = Fixture::new();
    let before = t.fs.statfs().unwrap();
    t.file_with(b"big", &[7; 10_000]);
    let after = t.fs.statfs().unwrap();

    assert_eq!(before.bsize, 4096);
    assert_eq!(before.bfree - after.bfree, 3);
    assert_eq!(before.ffree - after.ffree, 1);
    assert_eq!(after.namemax, 255);
}
