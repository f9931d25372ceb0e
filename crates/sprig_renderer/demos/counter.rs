//! Counter Demo
//!
//! Mounts a counter component into the in-memory host, clicks its button a
//! few times, and prints the host tree plus the operations each step emitted:
//! - Reads inside the render function subscribe the component
//! - A computed value derives the parity label
//! - Each click queues a re-render that `flush` applies
//!
//! Run with: RUST_LOG=sprig_renderer=debug cargo run -p sprig_renderer --example counter

use std::cell::Cell;
use std::rc::Rc;

use sprig_core::{Computed, Runtime};
use sprig_renderer::testing::RecordingHost;
use sprig_renderer::vnode::{component, element};
use sprig_renderer::{
    component_fn, ComponentDef, Container, HostNode, PropValue, Props, RenderFn, Renderer, Result,
};
use tracing_subscriber::EnvFilter;

struct Counter {
    value: Cell<i64>,
}

impl Counter {
    fn get(self: &Rc<Self>, rt: &Runtime) -> i64 {
        rt.track(self, "value");
        self.value.get()
    }

    fn add(self: &Rc<Self>, rt: &Runtime, step: i64) {
        let next = self.value.get() + step;
        self.value.set(next);
        rt.trigger(self, "value", &next);
    }
}

fn counter_app() -> ComponentDef {
    component_fn("CounterApp", |props: &Props| -> RenderFn {
        let step = match props.get("step") {
            Some(PropValue::Int(step)) => *step,
            _ => 1,
        };
        let state = Rc::new(Counter {
            value: Cell::new(0),
        });
        let mut parity: Option<Computed<&'static str>> = None;

        Box::new(move |rt: &Runtime, _props: &Props| {
            let parity = parity.get_or_insert_with(|| {
                let state = Rc::clone(&state);
                Computed::new(rt, move |rt: &Runtime| {
                    if state.get(rt) % 2 == 0 {
                        "even"
                    } else {
                        "odd"
                    }
                })
            });

            let on_click = {
                let rt = rt.clone();
                let state = Rc::clone(&state);
                PropValue::handler(move || state.add(&rt, step))
            };

            element("div")
                .child(element("p").text(format!("count: {}", state.get(rt))))
                .child(element("p").text(parity.get(rt).unwrap_or_default()))
                .child(element("button").prop("onClick", on_click).text("+"))
                .build()
        })
    })
}

fn button(renderer: &Renderer<RecordingHost>, container: &Container) -> Option<HostNode> {
    let host = renderer.host();
    let div = host.children(container.node()).first().copied()?;
    host.children(div).get(2).copied()
}

fn print_frame(renderer: &Renderer<RecordingHost>, container: &Container, label: &str) {
    let mut host = renderer.host_mut();
    let ops = host.take_ops();
    println!("== {} ({} ops) ==", label, ops.len());
    println!("{}", host.serialize(container.node()));
    for op in &ops {
        println!("    {:?}", op);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut host = RecordingHost::new();
    let container = Container::new(host.create_root("app"));
    let renderer = Renderer::new(host);

    let app = counter_app();
    renderer.render(Some(component(&app).prop("step", 3).build()), &container)?;
    print_frame(&renderer, &container, "mounted");

    for click in 1..=3 {
        let handler = button(&renderer, &container)
            .and_then(|node| renderer.host().handler(node, "onClick"));
        if let Some(handler) = handler {
            handler();
        }
        let ran = renderer.flush()?;
        print_frame(&renderer, &container, &format!("click {}, {} update(s)", click, ran));
    }

    renderer.render(None, &container)?;
    print_frame(&renderer, &container, "unmounted");
    Ok(())
}
