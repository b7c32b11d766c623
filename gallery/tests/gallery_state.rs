use gallery::{
    GalleryController, GalleryError, Group, Message, PreferencesStore, ThumbnailSize, PAGE_SIZE,
};
use media_library::{AssetPage, MediaError, PageRequest, PermissionStatus};
use mocks::{base_time, numbered_assets, FailingStore, MockLibrary};
use std::collections::HashSet;
use std::sync::Arc;
use store::{KeyValueStore, MemoryStore};

fn controller_with<S: KeyValueStore>(
    lib: &MockLibrary,
    store: S,
) -> GalleryController<MockLibrary, S> {
    GalleryController::new(lib.clone(), Arc::new(PreferencesStore::new(store)))
}

fn controller(lib: &MockLibrary) -> (GalleryController<MockLibrary, MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    (controller_with(lib, store.clone()), store)
}

fn ids(ctrl: &GalleryController<MockLibrary, impl KeyValueStore>) -> Vec<String> {
    ctrl.photos().iter().map(|p| p.id.clone()).collect()
}

fn assert_unique(ctrl: &GalleryController<MockLibrary, impl KeyValueStore>) {
    let all = ids(ctrl);
    let unique: HashSet<&String> = all.iter().collect();
    assert_eq!(all.len(), unique.len(), "duplicate ids in {:?}", all);
}

#[tokio::test]
async fn test_initial_state() {
    let lib = MockLibrary::with_photos(3);
    let (ctrl, _) = controller(&lib);
    assert!(ctrl.photos().is_empty());
    assert!(ctrl.has_more());
    assert!(!ctrl.is_loading());
    assert!(ctrl.error().is_none());
    assert!(ctrl.preview().is_none());
}

#[tokio::test]
async fn test_first_load_fetches_one_page() {
    let lib = MockLibrary::with_photos(100);
    let (mut ctrl, _) = controller(&lib);

    let added = ctrl.load_photos(false).await.unwrap();
    assert_eq!(added, PAGE_SIZE);
    assert_eq!(ctrl.photos().len(), 30);
    assert!(ctrl.has_more());
    assert!(!ctrl.is_loading());
    assert_eq!(lib.requests(), vec![PageRequest::first(30)]);
    assert_eq!(ctrl.photos()[0].uri, "file:///local/p000.jpg");
}

#[tokio::test]
async fn test_load_more_appends_only_new_photos() {
    let lib = MockLibrary::with_photos(30);
    let (mut ctrl, _) = controller(&lib);
    lib.push_page(AssetPage {
        assets: numbered_assets(0, 30),
        end_cursor: Some("30".into()),
        has_next_page: true,
    });
    ctrl.load_photos(false).await.unwrap();

    // 10 new and 5 already listed.
    let mut assets = numbered_assets(30, 10);
    assets.extend(numbered_assets(25, 5));
    lib.push_page(AssetPage {
        assets,
        end_cursor: Some("45".into()),
        has_next_page: true,
    });

    let added = ctrl.load_photos(true).await.unwrap();
    assert_eq!(added, 10);
    assert_eq!(ctrl.photos().len(), 40);
    assert!(ctrl.has_more());
    assert_eq!(lib.requests()[1], PageRequest::after(30, "30"));
    assert_unique(&ctrl);
}

#[tokio::test]
async fn test_last_page_stops_pagination() {
    let lib = MockLibrary::with_photos(40);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    let added = ctrl.load_photos(true).await.unwrap();
    assert_eq!(added, 10);
    assert!(!ctrl.has_more());

    // No further request once the library reported the end.
    assert_eq!(ctrl.load_photos(true).await.unwrap(), 0);
    assert_eq!(lib.requests().len(), 2);
}

#[tokio::test]
async fn test_page_of_duplicates_stops_pagination() {
    let lib = MockLibrary::with_photos(60);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();

    lib.push_page(AssetPage {
        assets: numbered_assets(0, 30),
        end_cursor: Some("30".into()),
        has_next_page: true,
    });
    let added = ctrl.load_photos(true).await.unwrap();
    assert_eq!(added, 0);
    assert!(!ctrl.has_more());
    assert_eq!(ctrl.photos().len(), 30);
    assert_eq!(lib.requests().len(), 2);
}

#[tokio::test]
async fn test_end_without_cursor_stops_pagination() {
    let lib = MockLibrary::with_photos(60);
    let (mut ctrl, _) = controller(&lib);
    lib.push_page(AssetPage {
        assets: numbered_assets(0, 5),
        end_cursor: None,
        has_next_page: false,
    });
    ctrl.load_photos(false).await.unwrap();
    assert!(!ctrl.has_more());
    assert_eq!(lib.requests().len(), 1);

    assert_eq!(ctrl.load_more().await.unwrap(), 0);
    assert_eq!(lib.requests().len(), 1);
    assert_eq!(ctrl.photos().len(), 5);

    // An explicit reload still fetches.
    ctrl.reload().await.unwrap();
    assert_eq!(lib.requests().len(), 2);
}

#[tokio::test]
async fn test_repeated_identical_pages_never_duplicate() {
    let lib = MockLibrary::with_photos(0);
    let (mut ctrl, _) = controller(&lib);
    let page = AssetPage {
        assets: numbered_assets(0, 5),
        end_cursor: Some("5".into()),
        has_next_page: true,
    };
    for _ in 0..3 {
        lib.push_page(page.clone());
    }
    ctrl.load_photos(false).await.unwrap();
    ctrl.load_photos(true).await.unwrap();
    // Pagination stopped after the duplicate page; a fresh load resets it.
    ctrl.load_photos(false).await.unwrap();
    assert_eq!(ctrl.photos().len(), 5);
    assert_unique(&ctrl);
}

#[tokio::test]
async fn test_duplicates_within_one_page_are_dropped() {
    let lib = MockLibrary::with_photos(0);
    let (mut ctrl, _) = controller(&lib);
    let mut assets = numbered_assets(0, 3);
    assets.push(assets[0].clone());
    lib.push_page(AssetPage {
        assets,
        end_cursor: Some("4".into()),
        has_next_page: false,
    });
    assert_eq!(ctrl.load_photos(false).await.unwrap(), 3);
    assert_unique(&ctrl);
}

#[tokio::test]
async fn test_reload_replaces_list_and_prunes_selection() {
    let lib = MockLibrary::with_photos(40);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    ctrl.load_photos(true).await.unwrap();
    assert!(ctrl.toggle_selection("p035"));
    assert!(ctrl.toggle_selection("p001"));
    ctrl.show_preview(ctrl.photos()[35].clone());

    ctrl.load_photos(false).await.unwrap();
    assert_eq!(ctrl.photos().len(), 30);
    assert!(ctrl.has_more());
    assert!(ctrl.is_selected("p001"));
    assert!(!ctrl.is_selected("p035"));
    assert!(ctrl.preview().is_none());
}

#[tokio::test]
async fn test_expired_cursor_refetches_everything_listed() {
    let lib = MockLibrary::with_photos(100);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    lib.push_page(AssetPage {
        assets: numbered_assets(30, 10),
        end_cursor: Some("40".into()),
        has_next_page: true,
    });
    ctrl.load_photos(true).await.unwrap();
    assert_eq!(ctrl.photos().len(), 40);

    lib.push_fault(MediaError::CursorExpired("40".into()));
    let added = ctrl.load_photos(true).await.unwrap();

    let requests = lib.requests();
    assert_eq!(requests[requests.len() - 2], PageRequest::after(30, "40"));
    assert_eq!(requests[requests.len() - 1], PageRequest::first(70));
    assert_eq!(added, 30);
    assert_eq!(ctrl.photos().len(), 70);
    assert!(ctrl.has_more());
    assert!(ctrl.error().is_none());
    assert_unique(&ctrl);
}

#[tokio::test]
async fn test_failed_fallback_degrades_to_fetch_failed() {
    let lib = MockLibrary::with_photos(100);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();

    lib.push_fault(MediaError::CursorExpired("30".into()));
    lib.push_fault(MediaError::Io("disk gone".into()));
    let res = ctrl.load_photos(true).await;
    assert!(matches!(res, Err(GalleryError::FetchFailed(_))));
    assert!(matches!(ctrl.error(), Some(GalleryError::FetchFailed(_))));
    assert_eq!(ctrl.photos().len(), 30);
    assert!(!ctrl.is_loading());
}

#[tokio::test]
async fn test_expired_cursor_on_fresh_load_is_not_retried() {
    let lib = MockLibrary::with_photos(10);
    let (mut ctrl, _) = controller(&lib);
    lib.push_fault(MediaError::CursorExpired("stale".into()));
    let res = ctrl.load_photos(false).await;
    assert_eq!(
        res,
        Err(GalleryError::FetchFailed("pagination cursor expired".into()))
    );
    assert_eq!(lib.requests().len(), 1);
}

#[tokio::test]
async fn test_permission_denied_leaves_list_untouched() {
    let lib = MockLibrary::with_photos(10);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();

    lib.set_permission(PermissionStatus::Denied, false);
    let res = ctrl.load_photos(false).await;
    assert_eq!(res, Err(GalleryError::PermissionDenied));
    assert_eq!(ctrl.error(), Some(&GalleryError::PermissionDenied));
    assert_eq!(ctrl.photos().len(), 10);
    assert!(!ctrl.is_loading());
    assert_eq!(lib.permission_requests(), 1);
    assert_eq!(lib.requests().len(), 1);
}

#[tokio::test]
async fn test_permission_requested_when_undetermined() {
    let lib = MockLibrary::with_photos(5);
    lib.set_permission(PermissionStatus::Undetermined, true);
    let (mut ctrl, _) = controller(&lib);
    assert_eq!(ctrl.load_photos(false).await.unwrap(), 5);
    assert_eq!(lib.permission_requests(), 1);

    ctrl.load_photos(false).await.unwrap();
    assert_eq!(lib.permission_requests(), 1);
}

#[tokio::test]
async fn test_generic_fault_keeps_prior_state_and_clears_on_success() {
    let lib = MockLibrary::with_photos(40);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();

    lib.push_fault(MediaError::Other("boom".into()));
    assert!(ctrl.load_photos(true).await.is_err());
    assert_eq!(ctrl.photos().len(), 30);
    assert!(ctrl.has_more());

    ctrl.load_photos(true).await.unwrap();
    assert_eq!(ctrl.photos().len(), 40);
    assert!(ctrl.error().is_none());
}

#[tokio::test]
async fn test_one_failed_resolution_fails_the_page() {
    let lib = MockLibrary::with_photos(5);
    lib.fail_resolve("p003");
    let (mut ctrl, _) = controller(&lib);
    let res = ctrl.load_photos(false).await;
    assert!(matches!(res, Err(GalleryError::FetchFailed(msg)) if msg.contains("p003")));
    assert!(ctrl.photos().is_empty());
}

#[tokio::test]
async fn test_remote_only_asset_keeps_library_uri() {
    let lib = MockLibrary::with_photos(2);
    lib.remote_only("p001");
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    assert_eq!(ctrl.photos()[0].uri, "file:///local/p000.jpg");
    assert_eq!(ctrl.photos()[1].uri, "ph://p001");
}

#[tokio::test]
async fn test_toggle_selection() {
    let lib = MockLibrary::with_photos(3);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();

    assert!(ctrl.toggle_selection("p001"));
    assert!(ctrl.is_selected("p001"));
    assert!(!ctrl.toggle_selection("p001"));
    assert_eq!(ctrl.selected_count(), 0);

    assert!(!ctrl.toggle_selection("unknown"));
    assert_eq!(ctrl.selected_count(), 0);
    assert_eq!(ctrl.photos().len(), 3);
}

#[tokio::test]
async fn test_select_all_in_group_is_an_involution() {
    // 48 hourly photos span three calendar days.
    let lib = MockLibrary::with_photos(48);
    let (mut ctrl, _) = controller(&lib);
    ctrl.preferences().set_group_by_day(true);
    ctrl.load_photos(false).await.unwrap();
    ctrl.load_photos(true).await.unwrap();

    let groups = ctrl.group_photos();
    assert!(groups.len() >= 2);
    let group: &Group = &groups[1];
    ctrl.toggle_selection(&groups[0].photos[0].id);
    ctrl.toggle_selection(&group.photos[0].id);
    let before = ctrl.selection().clone();

    ctrl.select_all_in_group(group);
    assert!(ctrl.is_group_fully_selected(group));
    ctrl.select_all_in_group(group);
    // Second application deselects the whole group, including the photo
    // selected beforehand.
    assert!(group.ids().all(|id| !ctrl.is_selected(id)));
    assert!(ctrl.is_selected(&groups[0].photos[0].id));

    ctrl.select_all_in_group(group);
    ctrl.select_all_in_group(group);
    let mut expected = before.clone();
    for id in group.ids() {
        expected.remove(id);
    }
    assert_eq!(ctrl.selection(), &expected);
}

#[tokio::test]
async fn test_select_all_in_group_twice_from_fully_selected_restores_selection() {
    let lib = MockLibrary::with_photos(5);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    let group = ctrl.group_photos().remove(0);

    ctrl.select_all_in_group(&group);
    let before = ctrl.selection().clone();
    ctrl.select_all_in_group(&group);
    ctrl.select_all_in_group(&group);
    assert_eq!(ctrl.selection(), &before);
}

#[tokio::test]
async fn test_stale_group_toggles_over_listed_photos() {
    let lib = MockLibrary::with_photos(3);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    let stale = Group {
        key: "March 2024".into(),
        date: base_time().date_naive(),
        photos: ctrl.photos().to_vec(),
    };

    ctrl.toggle_selection("p000");
    ctrl.delete_photos().await.unwrap();

    ctrl.update(Message::SelectGroup(stale.clone())).await.unwrap();
    assert_eq!(ctrl.selected_count(), 2);
    assert!(ctrl.is_group_fully_selected(&stale));

    ctrl.update(Message::SelectGroup(stale.clone())).await.unwrap();
    assert_eq!(ctrl.selected_count(), 0);
    assert!(!ctrl.is_group_fully_selected(&stale));
}

#[tokio::test]
async fn test_delete_removes_photos_and_counts_them() {
    let lib = MockLibrary::with_photos(10);
    let (mut ctrl, store) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    ctrl.preferences().increment_deleted_count(2).await;

    for id in ["p002", "p004", "p007"] {
        ctrl.toggle_selection(id);
    }
    ctrl.show_preview(ctrl.photos()[4].clone());

    let deleted = ctrl.delete_photos().await.unwrap();
    assert_eq!(deleted, 3);
    assert_eq!(ctrl.photos().len(), 7);
    assert!(ids(&ctrl).iter().all(|id| !["p002", "p004", "p007"].contains(&id.as_str())));
    assert_eq!(ctrl.selected_count(), 0);
    assert!(ctrl.preview().is_none());
    assert_eq!(ctrl.preferences().get().deleted_count, 5);
    assert_eq!(store.snapshot().get("deletedCount").map(String::as_str), Some("5"));
    assert_eq!(
        lib.deleted(),
        vec![vec!["p002".to_string(), "p004".to_string(), "p007".to_string()]]
    );
    assert!(!lib.asset_ids().contains(&"p004".to_string()));
}

#[tokio::test]
async fn test_failed_delete_changes_nothing() {
    let lib = MockLibrary::with_photos(10);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    ctrl.toggle_selection("p001");
    ctrl.toggle_selection("p002");

    lib.fail_next_delete(MediaError::Other("user cancelled".into()));
    let res = ctrl.delete_photos().await;
    assert!(matches!(res, Err(GalleryError::DeleteFailed(_))));
    assert!(matches!(ctrl.error(), Some(GalleryError::DeleteFailed(_))));
    assert_eq!(ctrl.photos().len(), 10);
    assert_eq!(ctrl.selected_count(), 2);
    assert_eq!(ctrl.preferences().get().deleted_count, 0);
}

#[tokio::test]
async fn test_successful_delete_clears_earlier_failure() {
    let lib = MockLibrary::with_photos(4);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    ctrl.toggle_selection("p003");

    lib.fail_next_delete(MediaError::Other("busy".into()));
    assert!(ctrl.delete_photos().await.is_err());
    assert!(ctrl.error().is_some());

    assert_eq!(ctrl.delete_photos().await.unwrap(), 1);
    assert!(ctrl.error().is_none());
    assert!(ctrl.subscribe().borrow().error.is_none());
}

#[tokio::test]
async fn test_delete_without_selection_is_a_no_op() {
    let lib = MockLibrary::with_photos(3);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    assert_eq!(ctrl.delete_photos().await.unwrap(), 0);
    assert!(lib.deleted().is_empty());
}

#[tokio::test]
async fn test_delete_survives_unpersisted_counter() {
    let lib = MockLibrary::with_photos(3);
    let mut ctrl = controller_with(&lib, FailingStore::failing_writes(MemoryStore::new()));
    ctrl.load_photos(false).await.unwrap();
    ctrl.toggle_selection("p000");
    assert_eq!(ctrl.delete_photos().await.unwrap(), 1);
    assert_eq!(ctrl.preferences().get().deleted_count, 1);
}

#[tokio::test]
async fn test_grouping_covers_every_listed_photo() {
    let lib = MockLibrary::with_photos(100);
    let (mut ctrl, _) = controller(&lib);
    ctrl.load_photos(false).await.unwrap();
    ctrl.load_photos(true).await.unwrap();

    for by_day in [false, true] {
        ctrl.preferences().set_group_by_day(by_day);
        let mut grouped: Vec<String> = ctrl
            .group_photos()
            .into_iter()
            .flat_map(|g| g.photos.into_iter().map(|p| p.id))
            .collect();
        grouped.sort();
        let mut listed = ids(&ctrl);
        listed.sort();
        assert_eq!(grouped, listed);
    }
}

#[tokio::test]
async fn test_column_count_follows_thumbnail_preference() {
    let lib = MockLibrary::with_photos(0);
    let (ctrl, _) = controller(&lib);
    assert_eq!(ctrl.column_count(390.0), 3);
    ctrl.preferences().set_thumbnail_size(ThumbnailSize::Small).await;
    assert_eq!(ctrl.column_count(390.0), 4);
    assert_eq!(ctrl.column_count(1.0), 1);
}

#[tokio::test]
async fn test_messages_drive_the_controller() {
    let lib = MockLibrary::with_photos(35);
    let (mut ctrl, _) = controller(&lib);
    let mut rx = ctrl.subscribe();

    ctrl.update(Message::LoadPhotos).await.unwrap();
    ctrl.update(Message::LoadMorePhotos).await.unwrap();
    assert_eq!(ctrl.photos().len(), 35);

    ctrl.update(Message::ToggleSelection("p010".into())).await.unwrap();
    let photo = ctrl.photos()[0].clone();
    ctrl.update(Message::ShowPreview(photo.clone())).await.unwrap();
    assert_eq!(ctrl.preview(), Some(&photo));
    ctrl.update(Message::HidePreview).await.unwrap();
    assert!(ctrl.preview().is_none());

    ctrl.update(Message::DeletePhotos).await.unwrap();
    assert_eq!(ctrl.photos().len(), 34);

    lib.fail_next_delete(MediaError::Other("nope".into()));
    ctrl.update(Message::ToggleSelection("p011".into())).await.unwrap();
    assert!(ctrl.update(Message::DeletePhotos).await.is_err());
    ctrl.update(Message::DismissError).await.unwrap();
    assert!(ctrl.error().is_none());
    ctrl.update(Message::ClearSelection).await.unwrap();
    assert_eq!(ctrl.selected_count(), 0);

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(&snapshot, ctrl.snapshot());
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn test_reset_counter_survives_restart() {
    let store = MemoryStore::new();
    let prefs = PreferencesStore::new(store.clone());
    prefs.increment_deleted_count(9).await;

    let restarted = PreferencesStore::new(store.clone());
    restarted.load().await;
    assert_eq!(restarted.get().deleted_count, 9);

    prefs.reset_deleted_count().await;
    let restarted = PreferencesStore::new(store);
    restarted.load().await;
    assert_eq!(restarted.get().deleted_count, 0);
}
