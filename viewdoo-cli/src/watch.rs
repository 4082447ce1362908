use std::path::{Path, PathBuf};

use notify::{
    event::{AccessKind, AccessMode, ModifyKind},
    Event, EventKind, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;
use viewdoo::view::Props;
use viewdoo::Error;

use crate::{logging, render};

/// Render the view every time its file is written.
pub async fn watch(path: PathBuf, props: Props) -> Result<(), Error> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            match event.kind {
                EventKind::Access(AccessKind::Close(AccessMode::Write))
                | EventKind::Modify(ModifyKind::Data(_)) => {
                    let _ = tx.send(());
                }
                _ => (),
            }
        }
    })
    .map_err(|err| Error::Error(Box::new(err)))?;

    watcher
        .watch(&path, RecursiveMode::NonRecursive)
        .map_err(|err| Error::Error(Box::new(err)))?;

    logging::watching(path.display());
    rerender(&path, &props);

    while rx.recv().await.is_some() {
        // Editors write in bursts.
        while rx.try_recv().is_ok() {}
        rerender(&path, &props);
    }

    Ok(())
}

fn rerender(path: &Path, props: &Props) {
    if let Err(err) = render::render(path, props) {
        match err {
            Error::View(viewdoo::view::template::Error::Pretty(report)) => eprintln!("{}", report),
            err => logging::error(err),
        }
    }
}
