//! Cached views over a small in-memory note store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::Response;

use vercache_cache::{CacheManager, MemoryCacheBackend};
use vercache_core::{Entity, Method, RequestContext};
use vercache_http::{
    CachedView, ModelDependency, QueryStringModifier, ResponseSerializer, RouteDependency, View,
};
use vercache_observability::CacheMetrics;
use vercache_versioning::{MasterVersionKeyVersioner, MemoryCounterStore, Versioner};

#[derive(Debug, Clone)]
struct Note {
    id: i64,
    user_id: i64,
    text: String,
}

impl Entity for Note {
    const TABLE: &'static str = "note";

    fn primary_key(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("id", Some(self.id.to_string()))]
    }

    fn foreign_keys(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("user_id", Some(self.user_id.to_string()))]
    }
}

type Db = Arc<Mutex<Vec<Note>>>;

struct NoteDetail(Db);

#[async_trait]
impl View for NoteDetail {
    fn name(&self) -> &str {
        "notes.detail"
    }

    async fn render(&self, ctx: &RequestContext) -> Response<String> {
        let id: i64 = ctx.param("note_id").and_then(|v| v.parse().ok()).unwrap_or(-1);
        let notes = self.0.lock().unwrap();
        match notes.iter().find(|n| n.id == id) {
            Some(note) => Response::new(note.text.clone()),
            None => Response::builder()
                .status(404)
                .body("not found".to_string())
                .unwrap(),
        }
    }
}

struct NoteList(Db);

#[async_trait]
impl View for NoteList {
    fn name(&self) -> &str {
        "notes.list"
    }

    async fn render(&self, ctx: &RequestContext) -> Response<String> {
        let notes = self.0.lock().unwrap();
        let mut texts: Vec<_> = notes.iter().map(|n| n.text.clone()).collect();
        if ctx.query_param("order") == Some("desc") {
            texts.reverse();
        }
        Response::new(texts.join(","))
    }
}

struct App {
    db: Db,
    versioner: Arc<Versioner>,
    metrics: Arc<CacheMetrics>,
    detail: CachedView<NoteDetail>,
    list: CachedView<NoteList>,
}

impl App {
    fn new() -> Self {
        let db: Db = Arc::new(Mutex::new(vec![Note {
            id: 1,
            user_id: 7,
            text: "first".into(),
        }]));
        let versioner = Arc::new(Versioner::with_default_inspector(Arc::new(
            MasterVersionKeyVersioner::new(MemoryCounterStore::new()),
        )));
        let metrics = Arc::new(CacheMetrics::new());
        let manager = CacheManager::new(
            versioner.clone(),
            Arc::new(MemoryCacheBackend::new()),
            Arc::new(ResponseSerializer::new()),
        )
        .with_sink(metrics.clone());

        let detail = CachedView::new(NoteDetail(db.clone()), manager.clone())
            .depends_on(RouteDependency::of::<Note>([("note_id", "id")]));
        let list = CachedView::new(NoteList(db.clone()), manager)
            .varies_on(QueryStringModifier::only(["order"]))
            .depends_on(ModelDependency::of::<Note>());

        Self {
            db,
            versioner,
            metrics,
            detail,
            list,
        }
    }

    async fn update(&self, id: i64, text: &str) {
        let mut tracker = self.versioner.tracker();
        let mut staged = self
            .db
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .unwrap();
        staged.text = text.to_string();
        tracker.updated(&staged);

        let db = self.db.clone();
        let (_, report) = tracker
            .commit_with(&self.versioner, || async move {
                let mut notes = db.lock().unwrap();
                let slot = notes.iter_mut().find(|n| n.id == staged.id).ok_or(())?;
                *slot = staged;
                Ok::<_, ()>(())
            })
            .await
            .unwrap();
        assert!(report.is_complete());
    }
}

fn cache_status(response: &Response<String>) -> &str {
    response.headers()["x-view-cache"].to_str().unwrap()
}

fn detail_request(id: i64) -> RequestContext {
    RequestContext::new(Method::Get, format!("/notes/{id}")).with_param("note_id", id.to_string())
}

#[tokio::test]
async fn update_invalidates_detail_and_list() {
    let app = App::new();
    let list_request = RequestContext::new(Method::Get, "/notes");

    assert_eq!(cache_status(&app.detail.render(&detail_request(1)).await), "MISS");
    assert_eq!(cache_status(&app.list.render(&list_request).await), "MISS");
    assert_eq!(cache_status(&app.detail.render(&detail_request(1)).await), "HIT");
    assert_eq!(cache_status(&app.list.render(&list_request).await), "HIT");

    app.update(1, "edited").await;

    let detail = app.detail.render(&detail_request(1)).await;
    assert_eq!(cache_status(&detail), "MISS");
    assert_eq!(detail.body(), "edited");

    let list = app.list.render(&list_request).await;
    assert_eq!(cache_status(&list), "MISS");
    assert_eq!(list.body(), "edited");

    let detail_stats = app.metrics.stats("notes.detail").unwrap();
    assert_eq!((detail_stats.hits, detail_stats.misses), (1, 2));
}

#[tokio::test]
async fn query_string_varies_the_key() {
    let app = App::new();
    app.db.lock().unwrap().push(Note {
        id: 2,
        user_id: 7,
        text: "second".into(),
    });

    let asc = RequestContext::new(Method::Get, "/notes").with_query("order", "asc");
    let desc = RequestContext::new(Method::Get, "/notes").with_query("order", "desc");
    let ignored = RequestContext::new(Method::Get, "/notes")
        .with_query("order", "asc")
        .with_query("utm", "mail");

    assert_eq!(app.list.render(&asc).await.body(), "first,second");
    assert_eq!(app.list.render(&desc).await.body(), "second,first");

    let again = app.list.render(&ignored).await;
    assert_eq!(cache_status(&again), "HIT");
    assert_eq!(again.body(), "first,second");
}

#[tokio::test]
async fn cached_status_codes_are_preserved() {
    let app = App::new();
    let missing = detail_request(99);

    let first = app.detail.render(&missing).await;
    let second = app.detail.render(&missing).await;
    assert_eq!(first.status(), 404);
    assert_eq!(second.status(), 404);
    assert_eq!(cache_status(&second), "HIT");
}
