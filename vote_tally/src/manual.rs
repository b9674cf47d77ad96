/*!

This is the long-form manual for `vote_tally` and `escrutinio`.

## Input datasets

Reconciliation consumes a tabular dataset in CSV (`csv`) or Excel (`xlsx`)
format. The first row must be a header. Only three logical fields are read;
every other column is carried along and ignored.

Column headers are matched case-insensitively against a list of accepted
aliases, in this priority order:

| logical field  | accepted headers                        |
|----------------|-----------------------------------------|
| voter id       | `dni`, `documento`, `votante_dni`       |
| category       | `categoria`, `category`, `tipo_voto`    |
| candidate name | `candidato`, `nombre_candidato`, `candidate` |

A minimal input file looks like this:

```text
dni,categoria,candidato
12345678,Presidencial,María González
87654321,Congresistas,Patricia Silva
```

### Category labels

The category cell is free-form and is classified by substring, after
lower-casing:

* contains `presid` -> `presidential`
* contains `congres` -> `congress`
* contains `distrit` -> `district`

`Presidencial`, `presidential` and `VOTO PRESIDENCIAL` all land in the same
race. Labels outside these three are reported as unknown categories; votes
for admin-created custom categories cannot be imported from a dataset, only
cast directly with the `vote` command.

### Candidate names

Names are matched exactly after trimming, case-insensitively, within the
classified category only. There is no fuzzy matching: a typo in the dataset
produces a per-row error, not a near-match.

### Row outcomes

Every row ends up in exactly one bucket:

* **processed**: the vote was committed and the candidate tally incremented.
* **duplicate**: this voter already voted in this category, either before the
  batch or in an earlier row of it. Counted, never reported as an error.
* **error**: the row was incomplete, its category was unknown, or no enabled
  candidate matched. The summary carries one message per error with the
  1-based row number.

A batch is never aborted by row-level problems; it always runs to the end of
the dataset.

## The data file

All state lives in a single JSON document (default `tally.json`, see
`--data`): candidates, categories, voter records, vote records and the
voting-closed flag. Every mutation rewrites the whole document through a
temporary file, so a crash mid-write leaves the previous state intact. A
`<data>.lock` file is held while a command runs; a second concurrent command
against the same data file is rejected rather than interleaved.

## Configuration

`escrutinio init` seeds the default election: the three categories above and
nine candidates. Pass `--config election.json` to seed a custom election
instead:

```json
{
    "outputSettings": {
        "contestName": "Elección municipal 2026"
    },
    "categories": [
        { "id": "mayor", "displayName": "Alcaldía" }
    ],
    "candidates": [
        { "name": "Elena Ruiz", "party": "Movimiento Cívico", "category": "mayor" }
    ]
}
```

Candidate ids may be given explicitly; omitted ones are derived from the
category. Categories default to enabled with a dense order following their
position in the file.

## Simulated training

The `train` command exists because the system this tool reconciles for
presents its batch import as a model-training pipeline. It reconciles the
dataset for real, then fabricates a loss/accuracy history and summary
metrics from a seeded hash. No model of any kind is trained and the numbers
carry no statistical meaning. Equal `--seed` values reproduce identical
reports, which is all they are good for.

 */
