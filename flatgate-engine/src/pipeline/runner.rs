use crate::engine::Engine;
use crate::pipeline::{Request, Response, Runner};
use tokio::runtime;

/// Drives one `Engine` from a request channel until the channel closes.
/// Each request runs its stage synchronously, answers, then yields the task
/// so the host side stays responsive.
pub struct EngineRunner {}

impl Runner for EngineRunner {
    type Input = Request;
    type Output = Response;

    fn run(
        input_channel: crossbeam::Receiver<Self::Input>,
        output_channel: crossbeam::Sender<Self::Output>,
    ) {
        let mut rt = runtime::Builder::new()
            .threaded_scheduler()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async move {
            let mut engine = Engine::new();
            while let Ok(request) = input_channel.recv() {
                let response = dispatch(&mut engine, request);
                if output_channel.send(response).is_err() {
                    break;
                }
                tokio::task::yield_now().await;
            }
        });
    }
}

fn dispatch(engine: &mut Engine, request: Request) -> Response {
    match request {
        Request::MakeList { config } => {
            let (addresses, services) = engine.make_list(&config);
            Response::MadeList {
                addresses,
                services,
            }
        }
        Request::Normalize => Response::Normalized {
            text: engine.normalize(),
        },
        Request::Flatten {
            addresses,
            services,
        } => Response::Flattened {
            text: engine.flatten(addresses, services),
        },
        Request::Lookup {
            list,
            fqdn_geo_match_all,
        } => {
            let (all, without_ineffectual) = engine.lookup(&list, fqdn_geo_match_all);
            Response::LookedUp {
                all,
                without_ineffectual,
            }
        }
    }
}
