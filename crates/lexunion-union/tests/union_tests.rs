use lexunion_core::config::{BackendKind, PipelineSettings, RetrieverSettings};
use lexunion_core::{ChildFailurePolicy, Document, Error, Result, Retriever, RetrieverConfig};
use lexunion_union::{add, build_pipeline, build_retriever, combine, union, Pipeline, Union};

fn documents() -> Vec<Document> {
    vec![
        Document::new().with("id", 0).with("title", "Paris").with("article", "This town is the capital of France").with("author", "Wikipedia"),
        Document::new().with("id", 1).with("title", "Eiffel tower").with("article", "Eiffel tower is based in Paris").with("author", "Wikipedia"),
        Document::new().with("id", 2).with("title", "Montreal").with("article", "Montreal is in Canada.").with("author", "Wikipedia"),
    ]
}

fn ids(docs: &[Document]) -> Vec<i64> {
    docs.iter().map(|d| d.get("id").and_then(|v| v.as_i64()).unwrap()).collect()
}

/// Returns the same ranked list for every query.
struct Fixed {
    config: RetrieverConfig,
    hits: Vec<Document>,
}

impl Fixed {
    fn new(on: &str, hits: &[i64]) -> Self {
        let hits = hits.iter().map(|&id| Document::new().with("id", id).with("from", on)).collect();
        Self { config: RetrieverConfig::new("id", on), hits }
    }
}

impl Retriever for Fixed {
    fn backend(&self) -> &'static str { "fixed" }
    fn config(&self) -> &RetrieverConfig { &self.config }
    fn set_k(&mut self, k: Option<usize>) { self.config.k = k; }
    fn add(&mut self, documents: &[Document]) -> Result<()> {
        self.hits.extend(documents.iter().cloned());
        Ok(())
    }
    fn search(&self, _query: &str) -> Result<Vec<Document>> {
        Ok(self.hits.iter().take(self.config.k.unwrap_or(usize::MAX)).cloned().collect())
    }
    fn len(&self) -> usize { self.hits.len() }
}

/// Stands in for an unreachable remote backend.
struct Failing {
    config: RetrieverConfig,
}

impl Failing {
    fn new() -> Self { Self { config: RetrieverConfig::new("id", "remote") } }
}

impl Retriever for Failing {
    fn backend(&self) -> &'static str { "failing" }
    fn config(&self) -> &RetrieverConfig { &self.config }
    fn set_k(&mut self, k: Option<usize>) { self.config.k = k; }
    fn add(&mut self, _documents: &[Document]) -> Result<()> { Err(Error::backend("failing", "unreachable")) }
    fn search(&self, _query: &str) -> Result<Vec<Document>> { Err(Error::backend("failing", "unreachable")) }
    fn len(&self) -> usize { 0 }
}

fn scenario_backends() -> [BackendKind; 4] {
    [BackendKind::TfIdf, BackendKind::Bm25Okapi, BackendKind::Bm25L, BackendKind::Tantivy]
}

fn leaf(kind: BackendKind, on: &str, k: Option<usize>) -> Pipeline {
    let r = build_retriever(kind, RetrieverConfig::new("id", on).with_k(k)).expect("retriever");
    Pipeline::Single(r)
}

#[test]
fn union_of_retrievers_over_every_backend_combination() {
    for k in [None, Some(3), Some(4)] {
        for a in scenario_backends() {
            for b in scenario_backends() {
                for c in scenario_backends() {
                    let label = format!("{} | {} | {} k={:?}", a, b, c, k);
                    let leaves = vec![
                        leaf(a, "author", k).add(&documents()).expect("add"),
                        leaf(b, "article", k).add(&documents()).expect("add"),
                        leaf(c, "title", k).add(&documents()).expect("add"),
                    ];
                    let search = Union::new(leaves, k).expect("union");
                    let search = Pipeline::from(search).add(&documents()).expect("add");

                    let answers = search.search("France").expect("search");
                    assert_eq!(answers.len(), k.map_or(1, |k| k.min(1)), "{}", label);
                    for sample in &answers {
                        for key in ["title", "article", "author"] {
                            assert!(sample.contains(key), "{}", label);
                        }
                    }

                    let answers = search.search("Wikipedia").expect("search");
                    assert_eq!(answers.len(), k.map_or(3, |k| k.min(3)), "{}", label);

                    assert!(search.search("Unknown").expect("search").is_empty(), "{}", label);
                }
            }
        }
    }
}

#[test]
fn combine_is_associative() {
    let make = || {
        (
            leaf(BackendKind::TfIdf, "title", None),
            leaf(BackendKind::Bm25Okapi, "article", None),
            leaf(BackendKind::Tantivy, "author", None),
        )
    };
    let queries = ["Paris", "Eiffel Paris wikipedia", "montreal canada", "nothing here"];

    let (a, b, c) = make();
    let left = combine(combine(a, b).unwrap(), c).unwrap().add(&documents()).unwrap();
    let (a, b, c) = make();
    let right = combine(a, combine(b, c).unwrap()).unwrap().add(&documents()).unwrap();
    let (a, b, c) = make();
    let flat = union(vec![a, b, c]).unwrap().add(&documents()).unwrap();

    for q in queries {
        let expected = ids(&flat.search(q).unwrap());
        assert_eq!(ids(&left.search(q).unwrap()), expected, "{}", q);
        assert_eq!(ids(&right.search(q).unwrap()), expected, "{}", q);
    }
    assert_eq!(left.leaves().len(), 3);
    assert_eq!(right.leaves().len(), 3);
}

#[test]
fn combine_is_associative_with_leaf_budgets() {
    let make = || {
        let mut a = Fixed::new("a", &[0, 1, 2]);
        a.set_k(Some(2));
        let mut b = Fixed::new("b", &[1, 3, 4]);
        b.set_k(Some(3));
        let mut c = Fixed::new("c", &[5, 6, 7, 8]);
        c.set_k(Some(4));
        (a, b, c)
    };

    let (a, b, c) = make();
    let left = combine(combine(a, b).unwrap(), c).unwrap();
    let (a, b, c) = make();
    let right = combine(a, combine(b, c).unwrap()).unwrap();
    let (a, b, c) = make();
    let flat = union(vec![a, b, c]).unwrap();

    for u in [&left, &right, &flat] {
        assert_eq!(u.k(), Some(4));
        assert_eq!(ids(&u.search("q").unwrap()), vec![0, 1, 3, 4]);
    }
}

#[test]
fn combine_is_associative_over_budgeted_unions() {
    // x is a union with a shared budget of 2, y and z are plain leaves
    let make = || {
        let x = Union::new(vec![Pipeline::from(Fixed::new("a", &[0, 1, 2])), Pipeline::from(Fixed::new("b", &[1, 3]))], Some(2))
            .unwrap();
        let mut y = Fixed::new("c", &[5, 6, 7]);
        y.set_k(Some(3));
        let z = Union::new(vec![Pipeline::from(Fixed::new("d", &[3, 9]))], Some(1)).unwrap();
        (x, y, z)
    };

    let (x, y, z) = make();
    let left = combine(combine(x, y).unwrap(), z).unwrap();
    let (x, y, z) = make();
    let right = combine(x, combine(y, z).unwrap()).unwrap();
    let (x, y, z) = make();
    let flat = union(vec![Pipeline::from(x), Pipeline::from(y), Pipeline::from(z)]).unwrap();

    for u in [&left, &right, &flat] {
        assert_eq!(u.k(), Some(3));
        assert_eq!(ids(&u.search("q").unwrap()), vec![0, 1, 3]);
        let budgets: Vec<Option<usize>> = u.leaves().iter().map(|r| r.config().k).collect();
        assert_eq!(budgets, vec![Some(2), Some(2), Some(3), Some(1)]);
    }
}

#[test]
fn nested_unions_flatten_in_declaration_order() {
    let inner = union(vec![Fixed::new("b", &[2]), Fixed::new("c", &[3])]).unwrap();
    let outer = combine(Fixed::new("a", &[1]), inner).unwrap();
    let order: Vec<&str> = outer.leaves().iter().map(|r| r.config().on.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    assert_eq!(ids(&outer.search("anything").unwrap()), vec![1, 2, 3]);
}

#[test]
fn duplicate_keys_take_earliest_declared_child_position() {
    let u = union(vec![Fixed::new("first", &[5, 7]), Fixed::new("second", &[7, 9, 5])]).unwrap();
    let hits = u.search("q").unwrap();
    assert_eq!(ids(&hits), vec![5, 7, 9]);
    assert_eq!(hits[1].text("from"), "first");

    let swapped = union(vec![Fixed::new("second", &[7, 9, 5]), Fixed::new("first", &[5, 7])]).unwrap();
    assert_eq!(ids(&swapped.search("q").unwrap()), vec![7, 9, 5]);
}

#[test]
fn real_backends_dedup_documents_matched_on_several_fields() {
    let u = union(vec![leaf(BackendKind::TfIdf, "title", None), leaf(BackendKind::TfIdf, "article", None)])
        .unwrap()
        .add(&documents())
        .unwrap();
    // title matches 1 ("Eiffel tower"), article matches 1 too
    assert_eq!(ids(&u.search("eiffel").unwrap()), vec![1]);
    // title match on 0 comes before the article match on 1
    assert_eq!(ids(&u.search("paris").unwrap()), vec![0, 1]);
}

#[test]
fn budget_is_respected() {
    let parts = || vec![Fixed::new("a", &[1, 2, 3]), Fixed::new("b", &[4, 5, 6])];
    for k in 1..=7 {
        let u = Union::new(parts().into_iter().map(Pipeline::from).collect(), Some(k)).unwrap();
        assert_eq!(u.search("q").unwrap().len(), k.min(6));
        assert!(u.children().iter().all(|c| c.config().k == Some(k)));
    }
    let unbounded = union(parts()).unwrap();
    assert_eq!(unbounded.k(), None);
    assert_eq!(unbounded.search("q").unwrap().len(), 6);
}

#[test]
fn set_k_propagates_to_leaves() {
    let mut u = Union::new(vec![Pipeline::from(Fixed::new("a", &[1, 2, 3]))], None).unwrap();
    u.set_k(Some(2));
    assert_eq!(ids(&u.search("q").unwrap()), vec![1, 2]);
    assert_eq!(u.children()[0].config().k, Some(2));
}

#[test]
fn union_budget_applies_over_children_with_other_budgets() {
    let mut b = Fixed::new("b", &[1, 2, 3, 4]);
    b.set_k(Some(3));
    let mut c = Fixed::new("c", &[5, 6, 7]);
    c.set_k(Some(2));
    let u = combine(b, c).unwrap();
    assert_eq!(u.k(), Some(3));
    assert_eq!(ids(&u.search("q").unwrap()), vec![1, 2, 3]);
}

#[test]
fn combine_takes_widest_operand_budget() {
    let a = Fixed::new("a", &[]);
    let mut b = Fixed::new("b", &[]);
    b.set_k(Some(3));
    let mut c = Fixed::new("c", &[]);
    c.set_k(Some(2));
    assert_eq!(combine(b, c).unwrap().k(), Some(3));

    let mut b = Fixed::new("b", &[]);
    b.set_k(Some(3));
    assert_eq!(combine(a, b).unwrap().k(), None);
}

#[test]
fn no_match_anywhere_is_empty() {
    let u = union(vec![
        leaf(BackendKind::Bm25L, "title", Some(3)),
        leaf(BackendKind::Keyword, "author", Some(3)),
    ])
    .unwrap();
    assert!(u.search("Paris").unwrap().is_empty());
    let u = u.add(&documents()).unwrap();
    assert!(u.search("Unknown").unwrap().is_empty());
    assert!(u.search("").unwrap().is_empty());
}

#[test]
fn add_is_distributive() {
    let q = ["Paris", "wikipedia", "tower canada"];
    let together = union(vec![leaf(BackendKind::TfIdf, "title", None), leaf(BackendKind::Tantivy, "article", None)])
        .unwrap()
        .add(&documents())
        .unwrap();
    let separately = union(vec![
        leaf(BackendKind::TfIdf, "title", None).add(&documents()).unwrap(),
        leaf(BackendKind::Tantivy, "article", None).add(&documents()).unwrap(),
    ])
    .unwrap();
    for query in q {
        assert_eq!(together.search(query).unwrap(), separately.search(query).unwrap(), "{}", query);
    }
}

#[test]
fn add_reaches_every_leaf_and_empty_add_is_noop() {
    let u = union(vec![
        leaf(BackendKind::TfIdf, "title", None),
        leaf(BackendKind::Bm25Okapi, "article", None),
        leaf(BackendKind::Keyword, "author", None),
    ])
    .unwrap();
    let u = add(u, &[]).unwrap();
    assert!(u.leaves().iter().all(|r| r.is_empty()));
    let u = add(u, &documents()).unwrap();
    assert!(u.leaves().iter().all(|r| r.len() == 3));
}

#[test]
fn add_rejects_documents_without_key() {
    let u = union(vec![leaf(BackendKind::TfIdf, "title", None)]).unwrap();
    let err = u.add(&[Document::new().with("title", "orphan")]).unwrap_err();
    assert!(matches!(err.error(), Error::MissingField { .. }));
}

#[test]
fn rejected_batch_hands_the_pipeline_back_intact() {
    let u = union(vec![
        leaf(BackendKind::TfIdf, "title", None),
        leaf(BackendKind::Tantivy, "article", None),
        leaf(BackendKind::Keyword, "author", None),
    ])
    .unwrap()
    .add(&documents())
    .unwrap();

    let mut batch = vec![Document::new().with("id", 7).with("title", "Lyon")];
    batch.push(Document::new().with("title", "orphan"));
    let (u, error) = u.add(&batch).unwrap_err().into_parts();
    assert!(matches!(error, Error::MissingField { .. }));

    // no leaf saw any part of the rejected batch
    assert!(u.leaves().iter().all(|r| r.len() == 3));
    assert!(u.search("lyon").unwrap().is_empty());
    assert_eq!(ids(&u.search("Paris").unwrap()), vec![0, 1]);

    let u = u.add(&batch[..1]).unwrap();
    assert_eq!(ids(&u.search("lyon").unwrap()), vec![7]);
}

#[test]
fn try_add_keeps_the_pipeline_after_a_backend_failure() {
    let mut p = union(vec![Pipeline::from(Fixed::new("a", &[1])), Pipeline::from(Failing::new())]).unwrap();
    assert!(matches!(p.try_add(&documents()), Err(Error::Backend { .. })));
    assert_eq!(p.leaves().len(), 2);

    let err = p.add(&documents()).unwrap_err();
    let p = err.into_pipeline();
    assert_eq!(p.leaves()[0].config().on, "a");
}

#[test]
fn failing_child_fails_fast_by_default() {
    let u = union(vec![Pipeline::from(Fixed::new("a", &[1])), Pipeline::from(Failing::new())]).unwrap();
    assert!(matches!(u.search("q"), Err(Error::Backend { .. })));
}

#[test]
fn failing_child_degrades_to_empty_when_configured() {
    let u = Union::new(vec![Pipeline::from(Failing::new()), Pipeline::from(Fixed::new("a", &[1, 2]))], None)
        .unwrap()
        .with_policy(ChildFailurePolicy::Degrade);
    assert_eq!(ids(&u.search("q").unwrap()), vec![1, 2]);

    // add failures are never swallowed
    let u = Pipeline::from(u);
    assert!(u.add(&documents()).is_err());
}

#[test]
fn parallel_fan_out_matches_sequential() {
    let build = |parallel: bool| {
        let parts = vec![
            leaf(BackendKind::Tantivy, "article", None),
            leaf(BackendKind::TfIdf, "title", None),
            leaf(BackendKind::Bm25Okapi, "author", None),
        ];
        Pipeline::from(Union::new(parts, Some(2)).unwrap().with_parallel(parallel)).add(&documents()).unwrap()
    };
    let (seq, par) = (build(false), build(true));
    for q in ["Paris", "wikipedia", "Montreal Eiffel", "zzz"] {
        assert_eq!(ids(&seq.search(q).unwrap()), ids(&par.search(q).unwrap()), "{}", q);
    }
}

#[test]
fn union_rejects_mismatched_keys_and_empty_input() {
    let other = build_retriever(BackendKind::TfIdf, RetrieverConfig::new("uuid", "title")).unwrap();
    let err = union(vec![leaf(BackendKind::TfIdf, "title", None), Pipeline::Single(other)]).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
    assert!(union(Vec::<Pipeline>::new()).is_err());
    assert!(Union::new(vec![leaf(BackendKind::TfIdf, "title", None)], Some(0)).is_err());
}

#[test]
fn pipeline_from_settings() {
    let settings = PipelineSettings {
        key: "id".into(),
        k: Some(2),
        parallel: true,
        on_child_failure: ChildFailurePolicy::Degrade,
        retrievers: vec![
            RetrieverSettings { backend: BackendKind::Keyword, on: "author".into() },
            RetrieverSettings { backend: BackendKind::Tantivy, on: "article".into() },
        ],
    };
    let p = build_pipeline(&settings).unwrap().add(&documents()).unwrap();
    match &p {
        Pipeline::Union(u) => {
            assert_eq!(u.k(), Some(2));
            assert!(u.is_parallel());
            assert_eq!(u.policy(), ChildFailurePolicy::Degrade);
        }
        other => panic!("expected a union, got {:?}", other),
    }
    assert_eq!(ids(&p.search("Wikipedia").unwrap()), vec![0, 1]);
    assert_eq!(ids(&p.search("France").unwrap()), vec![0]);

    let single = PipelineSettings { retrievers: vec![settings.retrievers[1].clone()], ..settings };
    let p = build_pipeline(&single).unwrap().add(&documents()).unwrap();
    assert!(matches!(p, Pipeline::Single(_)));
    assert_eq!(p.k(), Some(2));
    assert_eq!(ids(&p.search("canada").unwrap()), vec![2]);
}
