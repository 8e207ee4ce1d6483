//! Timeline store tests

use serde_json::{Value, json};

use super::testutil::{create_user, test_server, test_server_with_max_entries, timeline_file_count};
use crate::store::Admiration;
use crate::user::User;
use crate::{json as jsonfile, paths};

fn note(id: &str, content: &str) -> Value {
    json!({"id": id, "type": "Note", "content": content})
}

/// Check the mirror invariant for every current timeline file: the
/// `local/` hard link exists iff the entry's id, parent or referrer
/// begins with the user's actor URL.
fn assert_mirror_invariant(user: &User) {
    let timeline_dir = user.base_dir().join("timeline");
    let actor = user.actor_url();

    for entry in std::fs::read_dir(&timeline_dir).unwrap().flatten() {
        let path = entry.path();
        let msg = jsonfile::read_file(&path).unwrap();
        let meta = msg.get("_snac").unwrap();

        let id = msg.get("id").and_then(Value::as_str).unwrap_or("");
        let parent = meta.get("parent").and_then(Value::as_str).unwrap_or("");
        let referrer = meta.get("referrer").and_then(Value::as_str).unwrap_or("");

        let expected = id.starts_with(actor)
            || (!parent.is_empty() && parent.starts_with(actor))
            || (!referrer.is_empty() && referrer.starts_with(actor));

        let local = paths::local_mirror(&path).unwrap();
        assert_eq!(
            local.exists(),
            expected,
            "mirror mismatch for {}",
            path.display()
        );
    }
}

#[test]
fn test_add_and_find_round_trip() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let id = "https://peer.example/notes/1";
    assert!(alice.timeline().add(
        id,
        &note(id, "hello"),
        Some("https://peer.example/notes/0"),
        Some("https://peer.example/users/carol"),
    ));

    let entry = alice.timeline().find(id).unwrap();
    assert_eq!(entry["type"], "Note");
    assert_eq!(entry["content"], "hello");

    let meta = &entry["_snac"];
    assert_eq!(meta["parent"], "https://peer.example/notes/0");
    assert_eq!(meta["referrer"], "https://peer.example/users/carol");
    assert_eq!(meta["version"], "snac/2.x");
    assert_eq!(meta["children"], json!([]));
    assert_eq!(meta["liked_by"], json!([]));
    assert_eq!(meta["announced_by"], json!([]));

    assert!(alice.timeline().here(id));
    assert!(!alice.timeline().here("https://peer.example/notes/unknown"));
}

#[test]
fn test_add_refuses_duplicate() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let id = "https://peer.example/notes/1";
    assert!(alice.timeline().add(id, &note(id, "first"), None, None));
    assert!(!alice.timeline().add(id, &note(id, "second"), None, None));

    assert_eq!(timeline_file_count(alice.base_dir(), id), 1);
    let entry = alice.timeline().find(id).unwrap();
    assert_eq!(entry["content"], "first");
}

#[test]
fn test_reply_updates_parent_children_and_tid() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let parent_id = "https://peer.example/notes/1";
    alice
        .timeline()
        .add(parent_id, &note(parent_id, "root"), None, None);
    let old_name = alice.timeline().find_file(parent_id).unwrap();

    let reply_id = "https://peer.example/notes/2";
    alice
        .timeline()
        .add(reply_id, &note(reply_id, "reply"), Some(parent_id), None);

    let new_name = alice.timeline().find_file(parent_id).unwrap();
    assert!(
        new_name.file_name().unwrap() > old_name.file_name().unwrap(),
        "parent must move to a fresh, later tid"
    );
    assert!(!old_name.exists());

    let parent = alice.timeline().find(parent_id).unwrap();
    assert_eq!(parent["_snac"]["children"], json!([reply_id]));
    assert_eq!(timeline_file_count(alice.base_dir(), parent_id), 1);
}

#[test]
fn test_reply_is_idempotent_on_children() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let parent_id = "https://peer.example/notes/1";
    let reply_id = "https://peer.example/notes/2";
    alice
        .timeline()
        .add(parent_id, &note(parent_id, "root"), None, None);
    alice
        .timeline()
        .add(reply_id, &note(reply_id, "reply"), Some(parent_id), None);

    // a like on the reply rewrites it with the same parent; the
    // child id must not be duplicated
    alice
        .timeline()
        .admire(reply_id, "https://peer.example/users/carol", Admiration::Like);

    let parent = alice.timeline().find(parent_id).unwrap();
    assert_eq!(parent["_snac"]["children"], json!([reply_id]));
}

#[test]
fn test_ancestor_rename_keeps_content() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let g = "https://peer.example/notes/g";
    let p = "https://peer.example/notes/p";
    let c = "https://peer.example/notes/c";

    alice.timeline().add(g, &note(g, "grandparent"), None, None);
    alice.timeline().add(p, &note(p, "parent"), Some(g), None);

    let g_before = alice.timeline().find(g).unwrap();
    let g_name_before = alice.timeline().find_file(g).unwrap();

    alice.timeline().add(c, &note(c, "child"), Some(p), None);

    // the grandparent was renamed to a fresh tid, content unchanged
    let g_name_after = alice.timeline().find_file(g).unwrap();
    assert!(g_name_after.file_name().unwrap() > g_name_before.file_name().unwrap());
    assert_eq!(alice.timeline().find(g).unwrap(), g_before);

    // the parent gained the child
    let parent = alice.timeline().find(p).unwrap();
    assert_eq!(parent["_snac"]["children"], json!([c]));

    for id in [g, p, c] {
        assert_eq!(timeline_file_count(alice.base_dir(), id), 1);
    }
}

#[test]
fn test_hostile_parent_cycle_terminates() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let a = "https://peer.example/notes/a";
    let b = "https://peer.example/notes/b";

    alice.timeline().add(a, &note(a, "a"), None, None);
    alice.timeline().add(b, &note(b, "b"), Some(a), None);

    // corrupt the store the way a hostile peer could: point a's
    // parent back at b
    let a_path = alice.timeline().find_file(a).unwrap();
    let mut a_msg = jsonfile::read_file(&a_path).unwrap();
    a_msg["_snac"]["parent"] = json!(b);
    jsonfile::write_file(&a_path, &a_msg).unwrap();

    // must terminate despite the a -> b -> a loop
    let c = "https://peer.example/notes/c";
    assert!(alice.timeline().add(c, &note(c, "c"), Some(b), None));

    for id in [a, b, c] {
        assert_eq!(timeline_file_count(alice.base_dir(), id), 1);
    }
}

#[test]
fn test_admire_like_is_idempotent() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let id = "https://peer.example/notes/1";
    alice.timeline().add(id, &note(id, "hi"), None, None);

    let carol = "https://carol.example/";
    alice.timeline().admire(id, carol, Admiration::Like);
    alice.timeline().admire(id, carol, Admiration::Like);

    let entry = alice.timeline().find(id).unwrap();
    assert_eq!(entry["_snac"]["liked_by"], json!([carol]));
    assert_eq!(entry["_snac"]["referrer"], json!(carol));
    assert_eq!(timeline_file_count(alice.base_dir(), id), 1);
}

#[test]
fn test_admire_announce_uses_its_own_list() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let id = "https://peer.example/notes/1";
    alice.timeline().add(id, &note(id, "hi"), None, None);

    alice
        .timeline()
        .admire(id, "https://carol.example/", Admiration::Announce);

    let entry = alice.timeline().find(id).unwrap();
    assert_eq!(entry["_snac"]["announced_by"], json!(["https://carol.example/"]));
    assert_eq!(entry["_snac"]["liked_by"], json!([]));
}

#[test]
fn test_admire_moves_entry_to_fresh_tid() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let id = "https://peer.example/notes/1";
    alice.timeline().add(id, &note(id, "hi"), None, None);
    let before = alice.timeline().find_file(id).unwrap();

    alice
        .timeline()
        .admire(id, "https://carol.example/", Admiration::Like);

    let after = alice.timeline().find_file(id).unwrap();
    assert!(after.file_name().unwrap() > before.file_name().unwrap());
    assert!(!before.exists());
}

#[test]
fn test_admire_unknown_object_is_ignored() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    alice.timeline().admire(
        "https://peer.example/notes/ghost",
        "https://carol.example/",
        Admiration::Like,
    );

    assert!(alice.timeline().list().is_empty());
}

#[test]
fn test_local_mirror_tracks_ownership() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();
    let own_id = format!("{}/p/1", alice.actor_url());

    // own post: mirrored
    alice.timeline().add(&own_id, &note(&own_id, "mine"), None, None);
    assert_mirror_invariant(&alice);

    // unrelated remote post: not mirrored
    let remote = "https://peer.example/notes/1";
    alice.timeline().add(remote, &note(remote, "theirs"), None, None);
    assert_mirror_invariant(&alice);

    // remote reply to the own post: mirrored, and the own post's
    // relinked file keeps its mirror
    let reply = "https://peer.example/notes/2";
    alice
        .timeline()
        .add(reply, &note(reply, "reply"), Some(&own_id), None);
    assert_mirror_invariant(&alice);

    // a like by the user mirrors the liked entry via the referrer
    alice
        .timeline()
        .admire(remote, alice.actor_url(), Admiration::Like);
    assert_mirror_invariant(&alice);
}

#[test]
fn test_local_mirror_is_a_hard_link() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let own_id = format!("{}/p/1", alice.actor_url());
    alice.timeline().add(&own_id, &note(&own_id, "mine"), None, None);

    let path = alice.timeline().find_file(&own_id).unwrap();
    let local = paths::local_mirror(&path).unwrap();

    // deleting the timeline side must not orphan the mirror content
    std::fs::remove_file(&path).unwrap();
    assert_eq!(jsonfile::read_file(&local).unwrap()["content"], "mine");
}

#[test]
fn test_del_removes_entry_and_mirror() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let own_id = format!("{}/p/1", alice.actor_url());
    alice.timeline().add(&own_id, &note(&own_id, "mine"), None, None);

    let path = alice.timeline().find_file(&own_id).unwrap();
    let local = paths::local_mirror(&path).unwrap();
    assert!(local.exists());

    alice.timeline().del(&own_id);

    assert!(!alice.timeline().here(&own_id));
    assert!(!local.exists());
}

#[test]
fn test_del_unknown_id_is_a_no_op() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    alice.timeline().del("https://peer.example/notes/ghost");
}

#[test]
fn test_list_is_newest_first_and_capped() {
    let (_dir, server) = test_server_with_max_entries(2);
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    for n in 0..4 {
        let id = format!("https://peer.example/notes/{}", n);
        alice.timeline().add(&id, &note(&id, "x"), None, None);
    }

    let listed = alice.timeline().list();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].file_name().unwrap() > listed[1].file_name().unwrap());

    // the newest entry is the last one added
    let newest = alice.timeline().get(&listed[0]).unwrap();
    assert_eq!(newest["id"], "https://peer.example/notes/3");
}

#[test]
fn test_list_ignores_non_json_files() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let id = "https://peer.example/notes/1";
    alice.timeline().add(id, &note(id, "x"), None, None);
    std::fs::write(
        alice.base_dir().join("timeline").join("stray.tmp"),
        "partial",
    )
    .unwrap();

    assert_eq!(alice.timeline().list().len(), 1);
}

#[test]
fn test_get_tolerates_truncated_file() {
    let (_dir, server) = test_server();
    create_user(&server, "alice");
    let alice = User::open(&server, "alice").unwrap();

    let path = alice
        .base_dir()
        .join("timeline")
        .join(format!("{}-{}.json", paths::tid(0), paths::fingerprint("x")));
    std::fs::write(&path, "{\"truncat").unwrap();

    assert_eq!(alice.timeline().get(&path), None);
}
