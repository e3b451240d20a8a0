//! Registration, lookup, scoped instantiation and listener dispatch.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use bundle_framework::{
    listener, BundleId, LoadedModule, ServiceEvent, ServiceProperties, ServiceSource,
    StaticModuleLoader, CLASS_PROPERTY,
};
use common::{framework, CardActivator};

#[derive(Debug, PartialEq)]
struct Card {
    owner: String,
    args: Vec<Value>,
}

fn card_factory(calls: &Arc<AtomicUsize>) -> ServiceSource {
    let calls = Arc::clone(calls);
    ServiceSource::factory(move |context, args| {
        calls.fetch_add(1, Ordering::SeqCst);
        Card {
            owner: context.id().to_string(),
            args: args.to_vec(),
        }
    })
}

#[test]
fn test_indexes_are_per_class_and_never_reused() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();

    let first = root.register_service("card", ServiceSource::value(1u8), ServiceProperties::new());
    let second = root.register_service("card", ServiceSource::value(2u8), ServiceProperties::new());
    let other = root.register_service("widget", ServiceSource::value(3u8), ServiceProperties::new());
    assert_eq!(first.service_index(), 1);
    assert_eq!(second.service_index(), 2);
    assert_eq!(other.service_index(), 1);

    assert!(second.unregister());
    assert!(!second.unregister());
    let third = root.register_service("card", ServiceSource::value(4u8), ServiceProperties::new());
    assert_eq!(third.service_index(), 3);
    assert_eq!(framework.service_count("card"), 2);
}

#[test]
fn test_class_attribute_is_authoritative() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();

    let registration = root.register_service(
        "card",
        ServiceSource::value(()),
        ServiceProperties::new().with(CLASS_PROPERTY, "impostor"),
    );
    assert_eq!(registration.properties().get(CLASS_PROPERTY), Some(&json!("card")));
}

#[test]
fn test_filter_requires_every_entry() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();

    root.register_service(
        "card",
        ServiceSource::value(()),
        ServiceProperties::new().with("SymbolicName", "x").with("Version", "1.0"),
    );
    root.register_service(
        "card",
        ServiceSource::value(()),
        ServiceProperties::new().with("SymbolicName", "x").with("Version", "2.0"),
    );

    let all = root.get_service_references("card", &ServiceProperties::new());
    assert_eq!(all.len(), 2);
    assert!(all[0].service_index() < all[1].service_index());

    let by_name = root.get_service_references("card", &ServiceProperties::new().with("SymbolicName", "x"));
    assert_eq!(by_name.len(), 2);

    let exact = root.get_service_references(
        "card",
        &ServiceProperties::new().with("SymbolicName", "x").with("Version", "2.0"),
    );
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].service_index(), 2);

    let mismatched = root.get_service_references(
        "card",
        &ServiceProperties::new().with("SymbolicName", "x").with("Version", "3.0"),
    );
    assert!(mismatched.is_empty());
    assert!(root.get_service_references("nothing", &ServiceProperties::new()).is_empty());
}

#[tokio::test]
async fn test_factory_is_scoped_per_context() {
    let loader = Arc::new(StaticModuleLoader::new());
    loader.define("/webapp/a", LoadedModule::default);
    let framework = framework(&loader);
    let root = framework.root();
    let (context, _) = root.install_bundle("/webapp/a").await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let registration = root.register_service("card", card_factory(&calls), ServiceProperties::new());
    let reference = Arc::clone(registration.reference());

    let first = root.get_service_as::<Card>(&reference, &[json!("a")]).unwrap();
    let cached = root.get_service_as::<Card>(&reference, &[json!("ignored")]).unwrap();
    assert!(Arc::ptr_eq(&first, &cached));
    assert_eq!(first.args, vec![json!("a")]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let other = context.get_service_as::<Card>(&reference, &[]).unwrap();
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(other.owner, context.id().to_string());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(reference.usage(), 2);
}

#[test]
fn test_value_service_is_shared() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();

    let registration = root.register_service("config", ServiceSource::value(7u64), ServiceProperties::new());
    let a = root.get_service_as::<u64>(registration.reference(), &[]).unwrap();
    let b = registration.reference().get_service(&root, &[]).unwrap();
    assert_eq!(*a, 7);
    assert!(b.downcast::<u64>().is_ok());
    assert_eq!(registration.usage(), 1);
}

#[test]
fn test_unget_reinvokes_factory() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();

    let calls = Arc::new(AtomicUsize::new(0));
    let registration = root.register_service("card", card_factory(&calls), ServiceProperties::new());
    let reference = registration.reference();

    let first = root.get_service(reference, &[]).unwrap();
    assert!(root.unget_service(reference));
    assert!(!root.unget_service(reference));
    assert_eq!(reference.usage(), 0);

    let second = root.get_service(reference, &[]).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(root.cached_instance_count(), 1);
}

#[test]
fn test_unregister_purges_every_cache() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();

    let calls = Arc::new(AtomicUsize::new(0));
    let registration = root.register_service("card", card_factory(&calls), ServiceProperties::new());
    let reference = Arc::clone(registration.reference());
    root.get_service(&reference, &[]).unwrap();
    assert_eq!(root.cached_instance_count(), 1);

    assert!(registration.unregister());
    assert!(!reference.is_registered());
    assert_eq!(reference.usage(), 0);
    assert_eq!(root.cached_instance_count(), 0);
    assert!(root.get_service(&reference, &[]).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_removed_context_cannot_obtain_services() {
    let loader = Arc::new(StaticModuleLoader::new());
    loader.define("/webapp/a", LoadedModule::default);
    let framework = framework(&loader);
    let root = framework.root();
    let registration = root.register_service("card", ServiceSource::value(()), ServiceProperties::new());

    let (context, _) = root.install_bundle("/webapp/a").await.unwrap();
    context.get_service(registration.reference(), &[]).unwrap();
    assert_eq!(registration.usage(), 1);

    root.remove_bundle("/webapp/a").await.unwrap();
    assert_eq!(registration.usage(), 0);
    assert!(context.get_service(registration.reference(), &[]).is_none());
}

#[tokio::test]
async fn test_card_scenario() {
    let loader = Arc::new(StaticModuleLoader::new());
    loader.define("/webapp/cards-x", || {
        LoadedModule::default().with_activator(Arc::new(CardActivator::new("x")))
    });
    loader.define("/webapp/cards-y", || {
        LoadedModule::default().with_activator(Arc::new(CardActivator::new("y")))
    });
    let framework = framework(&loader);
    let root = framework.root();

    root.install_bundle("/webapp/cards-x").await.unwrap();
    root.install_bundle("/webapp/cards-y").await.unwrap();

    let all = root.get_service_references("card", &ServiceProperties::new());
    assert_eq!(all.len(), 2);

    let y = root.get_service_references("card", &ServiceProperties::new().with("SymbolicName", "y"));
    assert_eq!(y.len(), 1);
    assert_eq!(
        root.get_service_as::<String>(&y[0], &[]).as_deref().map(String::as_str),
        Some("y")
    );

    root.remove_bundle("/webapp/cards-x").await.unwrap();
    let remaining = root.get_service_references("card", &ServiceProperties::new());
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].properties().get("SymbolicName"), Some(&json!("y")));
    assert_eq!(framework.bundle_state(BundleId::from("/webapp/cards-x")), bundle_framework::BundleState::Uninstalled);
}

#[test]
fn test_listeners_fire_in_registration_order() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let s = Arc::clone(&seen);
    root.add_service_listener(
        ServiceEvent::Registered,
        listener(move |reference| s.lock().push(format!("first:{}", reference.service_index()))),
    );
    let s = Arc::clone(&seen);
    root.add_service_listener(
        ServiceEvent::Registered,
        listener(move |reference| s.lock().push(format!("second:{}", reference.service_index()))),
    );
    let s = Arc::clone(&seen);
    root.add_service_listener(
        ServiceEvent::Unregistered,
        listener(move |reference| s.lock().push(format!("gone:{}", reference.class()))),
    );

    let registration = root.register_service("card", ServiceSource::value(()), ServiceProperties::new());
    registration.unregister();

    assert_eq!(*seen.lock(), vec!["first:1", "second:1", "gone:card"]);
}

#[test]
fn test_listener_removal_by_identity() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    let counting = listener(move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    root.add_service_listener(ServiceEvent::Registered, Arc::clone(&counting));
    root.add_service_listener(ServiceEvent::Registered, Arc::clone(&counting));

    assert!(root.remove_service_listener(ServiceEvent::Registered, &counting));
    root.register_service("card", ServiceSource::value(()), ServiceProperties::new());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    assert!(!root.remove_service_listener(ServiceEvent::Unregistered, &counting));
    let stranger = listener(|_| {});
    assert!(!root.remove_service_listener(ServiceEvent::Registered, &stranger));
}

#[test]
fn test_listener_may_register_services() {
    let loader = Arc::new(StaticModuleLoader::new());
    let framework = framework(&loader);
    let root = framework.root();

    let context = root.clone();
    root.add_service_listener(
        ServiceEvent::Registered,
        listener(move |reference| {
            if reference.class().as_str() == "card" {
                context.register_service("audit", ServiceSource::value(()), ServiceProperties::new());
            }
        }),
    );

    root.register_service("card", ServiceSource::value(()), ServiceProperties::new());
    assert_eq!(framework.service_count("audit"), 1);
}
