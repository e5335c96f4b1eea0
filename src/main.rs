mod entry;

use strest_cluster::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
